//! # Lifecycle Event Bus
//!
//! Canale bounded e asincrono che trasporta gli eventi di lifecycle dei job
//! verso osservatori esterni (ad esempio una UI). Gli eventi sono effimeri:
//! al massimo uno per job per stadio, nessuna history oltre quella bufferizzata
//! dal subscriber.
//!
//! Il bus è best-effort per contratto: senza subscriber l'emissione è un
//! no-op, e con un subscriber lento gli eventi in eccesso vengono scartati
//! invece di bloccare la pipeline.

use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::debug;

const EVENT_BUFFER: usize = 256;

/// Per-job lifecycle notification
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// A qualifying file was discovered
    Found { path: PathBuf },
    /// A conversion job started running
    StartConvert { path: PathBuf },
    /// The job reached a successful terminal state
    Success { path: PathBuf, output: PathBuf },
    /// The job reached a failed terminal state
    Failure { path: PathBuf, error: String },
}

impl LifecycleEvent {
    pub fn path(&self) -> &PathBuf {
        match self {
            LifecycleEvent::Found { path }
            | LifecycleEvent::StartConvert { path }
            | LifecycleEvent::Success { path, .. }
            | LifecycleEvent::Failure { path, .. } => path,
        }
    }
}

/// Optional multi-producer single-consumer event channel
#[derive(Clone, Default)]
pub struct EventBus {
    tx: Option<mpsc::Sender<LifecycleEvent>>,
}

impl EventBus {
    /// A bus nobody listens to; every emission is a no-op
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Create a bus with an attached subscriber
    pub fn subscribed() -> (Self, mpsc::Receiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (Self { tx: Some(tx) }, rx)
    }

    /// Emit an event without ever blocking the producer.
    ///
    /// With a full buffer the event is dropped; a stalled or absent consumer
    /// must never stall the conversion pipeline.
    pub fn emit(&self, event: LifecycleEvent) {
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.try_send(event) {
                debug!(
                    "Event for {} dropped (subscriber not keeping up)",
                    e.into_inner().path().display()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_accessor_covers_every_stage() {
        let path = PathBuf::from("/rec/a.mov");
        let events = [
            LifecycleEvent::Found { path: path.clone() },
            LifecycleEvent::StartConvert { path: path.clone() },
            LifecycleEvent::Success {
                path: path.clone(),
                output: PathBuf::from("/out/a.mp4"),
            },
            LifecycleEvent::Failure {
                path: path.clone(),
                error: "encoder failure".to_string(),
            },
        ];
        for event in &events {
            assert_eq!(event.path(), &path);
        }
    }

    #[test]
    fn test_emit_without_subscriber_is_noop() {
        let bus = EventBus::disabled();
        for _ in 0..10_000 {
            bus.emit(LifecycleEvent::Found {
                path: PathBuf::from("/rec/a.mov"),
            });
        }
    }

    #[tokio::test]
    async fn test_events_delivered_in_order() {
        let (bus, mut rx) = EventBus::subscribed();
        let path = PathBuf::from("/rec/a.mov");

        bus.emit(LifecycleEvent::Found { path: path.clone() });
        bus.emit(LifecycleEvent::StartConvert { path: path.clone() });
        bus.emit(LifecycleEvent::Success {
            path: path.clone(),
            output: PathBuf::from("/out/a.mp4"),
        });

        assert!(matches!(rx.recv().await.unwrap(), LifecycleEvent::Found { .. }));
        assert!(matches!(
            rx.recv().await.unwrap(),
            LifecycleEvent::StartConvert { .. }
        ));
        match rx.recv().await.unwrap() {
            LifecycleEvent::Success { output, .. } => {
                assert_eq!(output, PathBuf::from("/out/a.mp4"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_buffer_drops_instead_of_blocking() {
        let (bus, mut rx) = EventBus::subscribed();

        // overfill without draining; emit must return promptly every time
        for i in 0..(EVENT_BUFFER + 50) {
            bus.emit(LifecycleEvent::Found {
                path: PathBuf::from(format!("/rec/{}.mov", i)),
            });
        }

        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, EVENT_BUFFER);
    }
}
