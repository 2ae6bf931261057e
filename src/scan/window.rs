//! Sliding-window threshold evaluation
//!
//! A match at time `t` is counted together with every other match in
//! `[t − window, t]`. The rule alerts when some window's count
//! satisfies the threshold. When matches lack usable `eventTime`
//! values the evaluation degrades to positional windows, treating each
//! record position as a one-second tick.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::rule::Threshold;

/// The window that satisfied the threshold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowHit {
    /// Positions (into the match list) of the contributing matches
    pub members: Vec<usize>,
    /// Whether positional fallback was used instead of `eventTime`
    pub positional: bool,
}

/// Evaluate the threshold over sliding windows of matches.
///
/// `timestamps[i]` is the parsed `eventTime` of the i-th match, `None`
/// when missing; `positions[i]` is the record index of that match.
/// Returns the best satisfying window, or `None` when no window
/// satisfies the threshold.
pub fn evaluate(
    timestamps: &[Option<DateTime<Utc>>],
    positions: &[usize],
    window: Duration,
    threshold: Threshold,
) -> Option<WindowHit> {
    if timestamps.is_empty() {
        return None;
    }

    let positional = timestamps.iter().any(Option::is_none);
    let ticks: Vec<i64> = if positional {
        positions.iter().map(|&p| p as i64).collect()
    } else {
        let mut ticks: Vec<i64> = timestamps
            .iter()
            .map(|t| t.map(|dt| dt.timestamp()).unwrap_or_default())
            .collect();
        ticks.sort_unstable();
        ticks
    };

    let span = window.as_secs() as i64;
    let order = sorted_order(timestamps, positions, positional);

    // Two-pointer sweep: for each window end, shrink the start until the
    // span fits, then test the count.
    let mut best: Option<Vec<usize>> = None;
    let mut start = 0;
    for end in 0..ticks.len() {
        while ticks[end] - ticks[start] > span {
            start += 1;
        }
        let count = end - start + 1;
        if threshold.satisfied_by(count)
            && best.as_ref().map_or(true, |b| count > b.len())
        {
            best = Some(order[start..=end].to_vec());
        }
    }

    best.map(|mut members| {
        members.sort_unstable();
        WindowHit {
            members,
            positional,
        }
    })
}

/// Match indices re-ordered the same way the tick array was
fn sorted_order(
    timestamps: &[Option<DateTime<Utc>>],
    positions: &[usize],
    positional: bool,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..timestamps.len()).collect();
    if positional {
        order.sort_unstable_by_key(|&i| positions[i]);
    } else {
        order.sort_unstable_by_key(|&i| timestamps[i].map(|dt| dt.timestamp()).unwrap_or_default());
    }
    order
}
