//! Primitives shared by every crate in the BharatBartan payment server workspace.
//!
//! * [`Paise`] is the money type. All amounts are held in minor units (1 rupee = 100 paise) so that totals are exact.
//! * [`Secret`] wraps configuration values that must never end up in a log file.
//! * [`helpers`] contains small utilities for reading configuration from the environment.
mod paise;

pub mod helpers;
pub mod op;
mod secret;

pub use paise::{Paise, PaiseConversionError, CURRENCY_CODE};
pub use secret::Secret;
