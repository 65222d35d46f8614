use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of trades kept when no capacity is configured
pub const DEFAULT_LEDGER_CAPACITY: usize = 10;

/// A locally recorded swap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub input_token: String,
    pub output_token: String,
    pub input_amount: f64,
    pub output_amount: f64,
    /// Execution time, unix seconds
    pub executed_at: i64,
    pub trader: String,
}

/// Recent trades, newest first, with strict FIFO eviction
#[derive(Debug, Clone)]
pub struct TradeLedger {
    entries: VecDeque<TradeRecord>,
    capacity: usize,
}

impl TradeLedger {
    /// A ledger keeping `capacity` trades, clamped to `1..=DEFAULT_LEDGER_CAPACITY`
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, DEFAULT_LEDGER_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepend `trade`, evicting the oldest entries beyond capacity
    pub fn append(&mut self, trade: TradeRecord) {
        self.entries.push_front(trade);
        self.entries.truncate(self.capacity);
    }

    /// Trades in display order (newest first)
    pub fn entries(&self) -> Vec<TradeRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&TradeRecord> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for TradeLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY)
    }
}
