use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use {
    futures::FutureExt,
    tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc},
    tokio_util::{sync::CancellationToken, task::TaskTracker},
    tracing::{debug, error, info},
};

use crate::{handlers::Relay, update::Inbound};

/// Pulls inbound updates and runs each one in its own task.
///
/// A slow backend call for one user never holds up the loop, and a panic
/// inside one task is logged and contained.
pub struct Dispatcher {
    relay: Arc<Relay>,
    gate: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
}

impl Dispatcher {
    /// `max_concurrent` caps the number of running tasks; `None` leaves
    /// them uncapped.
    pub fn new(relay: Arc<Relay>, max_concurrent: Option<usize>) -> Self {
        Self {
            relay,
            gate: max_concurrent.map(|n| Arc::new(Semaphore::new(n.max(1)))),
            tracker: TaskTracker::new(),
        }
    }

    /// Consume `updates` until `cancel` fires or the sender side closes.
    ///
    /// Tasks already started keep running; see [`Dispatcher::drain`].
    pub async fn run(&self, mut updates: mpsc::Receiver<Inbound>, cancel: CancellationToken) {
        info!(
            max_concurrent = ?self.gate.as_ref().map(|g| g.available_permits()),
            "dispatcher started"
        );

        loop {
            let inbound = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("dispatcher cancelled");
                    break;
                },
                next = updates.recv() => match next {
                    Some(inbound) => inbound,
                    None => {
                        info!("update stream closed");
                        break;
                    },
                },
            };

            let permit = match &self.gate {
                Some(gate) => tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        info!("dispatcher cancelled while waiting for a free slot");
                        break;
                    },
                    permit = Arc::clone(gate).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                },
                None => None,
            };

            self.spawn_unit(inbound, permit);
        }

        info!(running = self.tracker.len(), "dispatcher stopped");
    }

    /// Wait for every spawned task to finish. Each is bounded by its own
    /// flow timeout.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        debug!("all update tasks finished");
    }

    /// Number of tasks still running.
    pub fn running(&self) -> usize {
        self.tracker.len()
    }

    fn spawn_unit(&self, inbound: Inbound, permit: Option<OwnedSemaphorePermit>) {
        let relay = Arc::clone(&self.relay);
        let user_id = inbound.user_id.clone();
        let chat_id = inbound.chat_id;
        let kind = inbound.action.kind();

        self.tracker.spawn(async move {
            let _permit = permit;
            let outcome = AssertUnwindSafe(relay.handle(inbound)).catch_unwind().await;
            if let Err(panic) = outcome {
                error!(
                    user_id,
                    chat_id,
                    kind,
                    panic = panic_message(panic.as_ref()),
                    "update handler panicked"
                );
                relay.report_fault(chat_id).await;
            }
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_common_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(s.as_ref()), "static message");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(owned.as_ref()), "owned message");

        let other: Box<dyn Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
