//! Coalesced change notifications
//!
//! Mutations hand their events to a small actor task. The actor keeps the
//! pending batch and flushes it to observers once no new events have arrived
//! for the debounce delay. Every arrival restarts the delay, so a burst of
//! edits reaches observers as one batch in the order the edits happened.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Capacity of the observer channel, counted in batches.
const OBSERVER_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeType {
    Created,
    Changed,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChangeEvent {
    pub kind: FileChangeType,
    /// Affected path. `None` invalidates the whole namespace.
    pub path: Option<String>,
}

impl FileChangeEvent {
    pub fn created(path: impl Into<String>) -> Self {
        Self {
            kind: FileChangeType::Created,
            path: Some(path.into()),
        }
    }

    pub fn changed(path: impl Into<String>) -> Self {
        Self {
            kind: FileChangeType::Changed,
            path: Some(path.into()),
        }
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            kind: FileChangeType::Deleted,
            path: Some(path.into()),
        }
    }

    pub fn namespace_changed() -> Self {
        Self {
            kind: FileChangeType::Changed,
            path: None,
        }
    }
}

/// Handle to the debounce actor.
///
/// Dropping the notifier lets the actor flush what it holds and exit.
pub struct ChangeNotifier {
    queue: mpsc::UnboundedSender<Vec<FileChangeEvent>>,
    observers: broadcast::Sender<Vec<FileChangeEvent>>,
}

impl ChangeNotifier {
    /// Spawn the actor on the current tokio runtime.
    pub fn spawn(delay: Duration) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let (observers, _) = broadcast::channel(OBSERVER_CAPACITY);
        tokio::spawn(run(rx, observers.clone(), delay));
        Self { queue, observers }
    }

    /// Append events to the pending batch and restart the delay.
    pub fn fire_soon(&self, events: Vec<FileChangeEvent>) {
        if events.is_empty() {
            return;
        }
        if self.queue.send(events).is_err() {
            tracing::warn!("Change notifier stopped, events dropped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<FileChangeEvent>> {
        self.observers.subscribe()
    }
}

async fn run(
    mut rx: mpsc::UnboundedReceiver<Vec<FileChangeEvent>>,
    observers: broadcast::Sender<Vec<FileChangeEvent>>,
    delay: Duration,
) {
    let mut pending: Vec<FileChangeEvent> = Vec::new();

    loop {
        if pending.is_empty() {
            match rx.recv().await {
                Some(events) => pending.extend(events),
                None => break,
            }
            continue;
        }

        match tokio::time::timeout(delay, rx.recv()).await {
            Ok(Some(events)) => pending.extend(events),
            Ok(None) => {
                flush(&observers, &mut pending);
                break;
            }
            Err(_) => flush(&observers, &mut pending),
        }
    }
}

fn flush(
    observers: &broadcast::Sender<Vec<FileChangeEvent>>,
    pending: &mut Vec<FileChangeEvent>,
) {
    let batch = std::mem::take(pending);
    let count = batch.len();
    if observers.send(batch).is_err() {
        tracing::trace!(count, "No observers, change batch dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_one_batch_in_order() {
        let notifier = ChangeNotifier::spawn(Duration::from_millis(5));
        let mut rx = notifier.subscribe();

        notifier.fire_soon(vec![FileChangeEvent::created("/a.php")]);
        tokio::time::sleep(Duration::from_millis(3)).await;
        notifier.fire_soon(vec![FileChangeEvent::changed("/a.php")]);
        tokio::time::sleep(Duration::from_millis(3)).await;
        notifier.fire_soon(vec![
            FileChangeEvent::deleted("/a.php"),
            FileChangeEvent::created("/b.php"),
        ]);

        let batch = rx.recv().await.unwrap();
        assert_eq!(
            batch,
            vec![
                FileChangeEvent::created("/a.php"),
                FileChangeEvent::changed("/a.php"),
                FileChangeEvent::deleted("/a.php"),
                FileChangeEvent::created("/b.php"),
            ]
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_period_splits_batches() {
        let notifier = ChangeNotifier::spawn(Duration::from_millis(5));
        let mut rx = notifier.subscribe();

        notifier.fire_soon(vec![FileChangeEvent::created("/a.php")]);
        let first = rx.recv().await.unwrap();
        assert_eq!(first, vec![FileChangeEvent::created("/a.php")]);

        notifier.fire_soon(vec![FileChangeEvent::namespace_changed()]);
        let second = rx.recv().await.unwrap();
        assert_eq!(second, vec![FileChangeEvent::namespace_changed()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_flushed_before_delay() {
        let notifier = ChangeNotifier::spawn(Duration::from_millis(10));
        let mut rx = notifier.subscribe();

        notifier.fire_soon(vec![FileChangeEvent::changed("/a.php")]);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(rx.try_recv().unwrap(), vec![FileChangeEvent::changed("/a.php")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_flushes_pending() {
        let notifier = ChangeNotifier::spawn(Duration::from_secs(60));
        let mut rx = notifier.subscribe();

        notifier.fire_soon(vec![FileChangeEvent::deleted("/gone.php")]);
        drop(notifier);

        assert_eq!(rx.recv().await.unwrap(), vec![FileChangeEvent::deleted("/gone.php")]);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&FileChangeEvent::namespace_changed()).unwrap();
        assert_eq!(json, r#"{"kind":"changed","path":null}"#);
    }
}
