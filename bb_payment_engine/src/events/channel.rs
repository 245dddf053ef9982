//! Simple stateless pub-sub event handler
//!
//! Producers push events onto a bounded queue. The handler pulls them off and runs the subscriber's async callback for
//! each one on its own task. The callback only sees the event, never the internal state of the system.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{
    sync::{mpsc, mpsc::error::TrySendError},
    task::JoinSet,
};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { listener: receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight callbacks to finish.
    pub async fn start_handler(mut self) {
        debug!("📬️ Starting event handler");
        // Only producers may keep the queue open
        drop(self.sender);
        let mut jobs = JoinSet::new();
        loop {
            tokio::select! {
                ev = self.listener.recv() => match ev {
                    Some(ev) => {
                        trace!("📬️ Handling event");
                        let handler = Arc::clone(&self.handler);
                        jobs.spawn(async move { (handler)(ev).await });
                    },
                    None => break,
                },
                Some(done) = jobs.join_next(), if !jobs.is_empty() => log_job_result(done),
            }
        }
        if !jobs.is_empty() {
            debug!("📬️ Waiting for {} jobs to complete", jobs.len());
        }
        while let Some(done) = jobs.join_next().await {
            log_job_result(done);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_job_result(result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => trace!("📬️ Event handled"),
        Err(e) => warn!("📬️ An event callback failed to complete. {e}"),
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    /// Queues the event, waiting for space if the queue is full.
    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }

    /// Queues the event without waiting. If the queue is full, the event is dropped and `false` is returned.
    pub fn try_publish_event(&self, event: E) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("📬️ Event queue is full. The event has been dropped.");
                false
            },
            Err(TrySendError::Closed(_)) => {
                error!("📬️ Failed to send event: the handler has shut down");
                false
            },
        }
    }
}
