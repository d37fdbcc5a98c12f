use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use buildview_core::actions::BuildAction;
use chrono::DateTime;
use chrono::Utc;

/// Where a delivery came from. Stream deliveries are dropped once their
/// stream has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Request,
    Stream(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scheduled {
    pub after: Duration,
    pub channel: Channel,
    pub action: BuildAction,
}

impl Scheduled {
    pub fn request(after: Duration, action: BuildAction) -> Self {
        Self {
            after,
            channel: Channel::Request,
            action,
        }
    }
}

#[derive(Debug)]
struct Entry {
    due: DateTime<Utc>,
    seq: u64,
    channel: Channel,
    action: BuildAction,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // BinaryHeap is a max-heap; invert so the earliest delivery pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending deliveries on a virtual clock. Entries due at the same instant
/// come out in the order they were pushed.
#[derive(Debug)]
pub struct DeliveryQueue {
    now: DateTime<Utc>,
    next_seq: u64,
    pending: BinaryHeap<Entry>,
}

impl DeliveryQueue {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: start,
            next_seq: 0,
            pending: BinaryHeap::new(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn push(&mut self, scheduled: Scheduled) {
        let due = chrono::Duration::from_std(scheduled.after)
            .ok()
            .and_then(|after| self.now.checked_add_signed(after))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.pending.push(Entry {
            due,
            seq: self.next_seq,
            channel: scheduled.channel,
            action: scheduled.action,
        });
        self.next_seq += 1;
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.pending.peek().map(|entry| entry.due)
    }

    /// Pops the earliest delivery due at or before `deadline`, moving the
    /// clock forward to its due time.
    pub fn pop_until(&mut self, deadline: DateTime<Utc>) -> Option<(Channel, BuildAction)> {
        if self.next_due()? > deadline {
            return None;
        }
        let entry = self.pending.pop()?;
        self.now = self.now.max(entry.due);
        Some((entry.channel, entry.action))
    }

    /// Moves the clock forward without delivering anything.
    pub fn advance_to(&mut self, instant: DateTime<Utc>) {
        self.now = self.now.max(instant);
    }
}

#[cfg(test)]
mod tests {
    use buildview_core::actions::RuntimeAction;
    use pretty_assertions::assert_eq;

    use super::*;

    fn tick(secs: i64) -> BuildAction {
        BuildAction::Runtime(RuntimeAction::ClockTicked(
            DateTime::from_timestamp(secs, 0).unwrap_or_default(),
        ))
    }

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_000, 0).unwrap_or_default()
    }

    #[test]
    fn earliest_first_then_push_order() {
        let mut queue = DeliveryQueue::new(start());
        queue.push(Scheduled::request(Duration::from_millis(300), tick(3)));
        queue.push(Scheduled::request(Duration::from_millis(100), tick(1)));
        queue.push(Scheduled::request(Duration::from_millis(100), tick(2)));

        let deadline = start() + chrono::Duration::seconds(1);
        let mut delivered = Vec::new();
        while let Some((_, action)) = queue.pop_until(deadline) {
            delivered.push(action);
        }

        assert_eq!(delivered, vec![tick(1), tick(2), tick(3)]);
        assert_eq!(queue.now(), start() + chrono::Duration::milliseconds(300));
    }

    #[test]
    fn unrepresentable_delays_wait_forever() {
        let mut queue = DeliveryQueue::new(start());
        queue.push(Scheduled::request(Duration::MAX, tick(9)));
        queue.push(Scheduled::request(Duration::from_millis(1), tick(1)));

        assert_eq!(queue.next_due(), Some(start() + chrono::Duration::milliseconds(1)));
        assert!(queue.pop_until(start() + chrono::Duration::days(365)).is_some());
        assert_eq!(queue.pop_until(start() + chrono::Duration::days(365)), None);
        assert_eq!(queue.next_due(), Some(DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn deliveries_after_deadline_stay_queued() {
        let mut queue = DeliveryQueue::new(start());
        queue.push(Scheduled::request(Duration::from_secs(5), tick(5)));

        assert_eq!(queue.pop_until(start() + chrono::Duration::seconds(1)), None);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.now(), start());
    }
}
