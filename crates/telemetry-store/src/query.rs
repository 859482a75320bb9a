//! Row selection shared by the store readers.

use std::cmp::Reverse;
use telemetry_core::types::{PerformanceSnapshot, Position, Signal, Trade};

/// Newest `limit` trades by entry time.
pub(crate) fn recent_trades(mut trades: Vec<Trade>, limit: usize) -> Vec<Trade> {
    trades.sort_by_key(|t| Reverse(t.entry_time));
    trades.truncate(limit);
    trades
}

/// All positions, most recently updated first.
pub(crate) fn open_positions(mut positions: Vec<Position>) -> Vec<Position> {
    positions.sort_by_key(|p| Reverse(p.updated_at));
    positions
}

/// Newest `limit` signals by creation time.
pub(crate) fn recent_signals(signals: Vec<Signal>, limit: usize, pending_only: bool) -> Vec<Signal> {
    let mut signals: Vec<Signal> = signals
        .into_iter()
        .filter(|s| !pending_only || s.is_pending())
        .collect();
    signals.sort_by_key(|s| Reverse(s.created_at));
    signals.truncate(limit);
    signals
}

/// Latest rollup by creation time.
pub(crate) fn latest_performance(rows: Vec<PerformanceSnapshot>) -> Option<PerformanceSnapshot> {
    rows.into_iter().max_by_key(|r| r.created_at)
}
