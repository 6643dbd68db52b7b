//=========================================================================
// Notifier
//=========================================================================
//
// Best-effort observer fan-out over crossbeam channels.
//
// Architecture:
//   owner ──publish(E)──► [Sender<E>; N] ──► Receiver<E> (subscribers)
//
// Subscribers drain their receivers whenever they like, on any thread.
// A subscriber that dropped its receiver is pruned on the next publish;
// it never causes the publishing transition to fail.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

//=== Notifier ============================================================

/// Multi-subscriber event publisher.
pub struct Notifier<E: Clone + Send + 'static> {
    subscribers: Vec<Sender<E>>,
}

impl<E: Clone + Send + 'static> Notifier<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Registers a new subscriber and returns its receiving end.
    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Sends `event` to every live subscriber.
    ///
    /// Returns the number of subscribers that received the event.
    pub fn publish(&mut self, event: E) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());

        let pruned = before - self.subscribers.len();
        if pruned > 0 {
            debug!("Pruned {} disconnected subscriber(s)", pruned);
        }

        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E: Clone + Send + 'static> fmt::Debug for Notifier<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<E: Clone + Send + 'static> Default for Notifier<E> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_harmless() {
        let mut notifier = Notifier::<u32>::new();
        assert_eq!(notifier.publish(7), 0);
    }

    #[test]
    fn every_subscriber_receives_each_event() {
        let mut notifier = Notifier::new();
        let a = notifier.subscribe();
        let b = notifier.subscribe();

        notifier.publish("first");
        notifier.publish("second");

        assert_eq!(a.try_iter().collect::<Vec<_>>(), vec!["first", "second"]);
        assert_eq!(b.try_iter().collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn dropped_subscriber_is_pruned() {
        let mut notifier = Notifier::new();
        let kept = notifier.subscribe();
        let dropped = notifier.subscribe();
        drop(dropped);

        assert_eq!(notifier.publish(1u8), 1);
        assert_eq!(notifier.subscriber_count(), 1);
        assert_eq!(kept.try_recv(), Ok(1));
    }
}
