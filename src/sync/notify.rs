//! Observer registry for coordinator events.

use tokio::sync::mpsc;

use crate::portal::types::AttendanceSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
  /// A new snapshot is authoritative
  Updated(AttendanceSnapshot),
  /// `refresh()` arrived inside the cooldown window
  CooldownRejected { seconds_remaining: u64 },
  /// A background refresh failed; the current snapshot stays
  Stale { reason: String },
  /// `refresh()` joined the fetch already in flight
  Coalesced,
}

pub type SubscriberId = u64;

pub struct Subscription {
  pub id: SubscriberId,
  pub receiver: mpsc::UnboundedReceiver<SyncEvent>,
}

#[derive(Default)]
pub struct Subscribers {
  next_id: SubscriberId,
  senders: Vec<(SubscriberId, mpsc::UnboundedSender<SyncEvent>)>,
}

impl Subscribers {
  pub fn subscribe(&mut self) -> Subscription {
    let (tx, receiver) = mpsc::unbounded_channel();
    let id = self.next_id;
    self.next_id += 1;
    self.senders.push((id, tx));
    Subscription { id, receiver }
  }

  /// Returns whether `id` was registered.
  pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
    let before = self.senders.len();
    self.senders.retain(|(sid, _)| *sid != id);
    self.senders.len() != before
  }

  /// Deliver `event` to every live subscriber, dropping closed ones.
  pub fn publish(&mut self, event: SyncEvent) {
    self.senders.retain(|(_, tx)| tx.send(event.clone()).is_ok());
  }

  pub fn count(&self) -> usize {
    self.senders.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_publish_reaches_every_subscriber() {
    let mut subscribers = Subscribers::default();
    let mut a = subscribers.subscribe();
    let mut b = subscribers.subscribe();

    subscribers.publish(SyncEvent::Coalesced);

    assert_eq!(a.receiver.try_recv().unwrap(), SyncEvent::Coalesced);
    assert_eq!(b.receiver.try_recv().unwrap(), SyncEvent::Coalesced);
  }

  #[test]
  fn test_unsubscribe() {
    let mut subscribers = Subscribers::default();
    let mut a = subscribers.subscribe();

    assert!(subscribers.unsubscribe(a.id));
    assert!(!subscribers.unsubscribe(a.id));

    subscribers.publish(SyncEvent::Coalesced);
    assert!(a.receiver.try_recv().is_err());
  }

  #[test]
  fn test_dropped_subscribers_are_pruned() {
    let mut subscribers = Subscribers::default();
    let kept = subscribers.subscribe();
    drop(subscribers.subscribe());

    subscribers.publish(SyncEvent::Stale {
      reason: "timeout".into(),
    });

    assert_eq!(subscribers.count(), 1);
    drop(kept);
  }
}
