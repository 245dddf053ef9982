//! Order lifecycle events.
//!
//! Components subscribe to events through [`EventHooks`]. Each hook is driven by its own bounded queue and runs
//! independently of the request that raised the event, so a slow subscriber (e.g. the mailer) never holds up an HTTP
//! response.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
