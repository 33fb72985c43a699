//! The inflight command queue: a min-heap of `(commit_ns, seq, command)` awaiting
//! simulated time to reach their commit time (spec §4.4/GLOSSARY), grounded on the
//! teacher's `event_queue: BinaryHeap<Reverse<ScheduledEvent>>` in `gym/flow/env.rs`.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::commands::TradingCommand;

/// One scheduled command, ordered by `(commit_ns, seq)` so that ties break FIFO by
/// submission order (spec §4.4: "ties by FIFO").
#[derive(Debug)]
struct ScheduledCommand {
    commit_ns: i64,
    seq: u64,
    command: TradingCommand,
}

impl PartialEq for ScheduledCommand {
    fn eq(&self, other: &Self) -> bool {
        self.commit_ns == other.commit_ns && self.seq == other.seq
    }
}
impl Eq for ScheduledCommand {}

impl PartialOrd for ScheduledCommand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledCommand {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the smallest `(commit_ns, seq)`
        // first, i.e. behaves as a min-heap.
        other.commit_ns.cmp(&self.commit_ns).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of commands awaiting their commit time (spec §4.4).
#[derive(Debug, Default)]
pub struct InflightQueue {
    heap: BinaryHeap<ScheduledCommand>,
    next_seq: u64,
}

impl InflightQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, commit_ns: i64, command: TradingCommand) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledCommand { commit_ns, seq, command });
    }

    /// Pops the next command if its commit time is `<= now_ns`, in nondecreasing
    /// `commit_ns` order with FIFO tie-break (spec §4.4/§5).
    pub fn pop_ready(&mut self, now_ns: i64) -> Option<(i64, TradingCommand)> {
        if self.heap.peek().is_some_and(|scheduled| scheduled.commit_ns <= now_ns) {
            let scheduled = self.heap.pop().expect("peeked Some above");
            Some((scheduled.commit_ns, scheduled.command))
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandHeader, TradingCommand};
    use crate::identifiers::{ClientOrderId, InstrumentId, StrategyId, TraderId, VenueOrderId};

    fn cancel(trader: &str) -> TradingCommand {
        TradingCommand::CancelOrder {
            header: CommandHeader {
                trader_id: TraderId::new(trader),
                strategy_id: StrategyId::new("S-1"),
                instrument_id: InstrumentId::new("EUR/USD", "SIM"),
                client_id: None,
                command_id: uuid::Uuid::nil(),
                ts_init: 0,
            },
            client_order_id: ClientOrderId::new("O-1"),
            venue_order_id: None::<VenueOrderId>,
        }
    }

    #[test]
    fn pops_in_commit_time_order_with_fifo_tiebreak() {
        let mut queue = InflightQueue::new();
        queue.push(100, cancel("first-at-100"));
        queue.push(50, cancel("at-50"));
        queue.push(100, cancel("second-at-100"));

        let (_, first) = queue.pop_ready(200).unwrap();
        assert!(matches!(first, TradingCommand::CancelOrder { header, .. } if header.trader_id.as_str() == "at-50"));

        let (_, second) = queue.pop_ready(200).unwrap();
        assert!(matches!(second, TradingCommand::CancelOrder { header, .. } if header.trader_id.as_str() == "first-at-100"));
    }

    #[test]
    fn does_not_pop_commands_not_yet_due() {
        let mut queue = InflightQueue::new();
        queue.push(100, cancel("future"));
        assert!(queue.pop_ready(50).is_none());
        assert!(queue.pop_ready(100).is_some());
    }
}
