use thiserror::Error;

use crate::model::{Topic, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("requested {requested} questions but only {available} are available")]
    InsufficientPool { requested: u32, available: u64 },
}

//
// ─── ALLOCATION ────────────────────────────────────────────────────────────────
//

/// Questions assigned to a single topic, plus its display share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicAllocation {
    pub topic_id: TopicId,
    pub count: u32,
    /// `round(100 * count / target)`, for display only. Shares across an
    /// allocation need not sum to exactly 100.
    pub percent: u32,
}

/// Per-topic question counts summing exactly to the requested target.
///
/// Zero-count topics are dropped; entries keep the order in which topics were
/// given to the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Allocation {
    entries: Vec<TopicAllocation>,
}

impl Allocation {
    #[must_use]
    pub fn entries(&self) -> &[TopicAllocation] {
        &self.entries
    }

    /// Sum of all assigned counts.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Assigned count for a topic; zero when the topic received nothing.
    #[must_use]
    pub fn count_for(&self, topic_id: TopicId) -> u32 {
        self.entries
            .iter()
            .find(|e| e.topic_id == topic_id)
            .map_or(0, |e| e.count)
    }

    /// Returns true when no topic received any questions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//
// ─── LARGEST-REMAINDER ALLOCATION ──────────────────────────────────────────────
//

// Working row for the distribution passes. `index` preserves input order for
// the final entry list and breaks ties deterministically.
struct Share {
    index: usize,
    topic_id: TopicId,
    available: u32,
    count: u32,
    remainder: f64,
}

impl Share {
    fn remaining_capacity(&self) -> u32 {
        self.available - self.count
    }
}

/// Distribute `target` questions across topics proportionally to each topic's
/// available pool, using the largest-remainder method.
///
/// Invariants on success: counts sum exactly to `target` and every count is
/// within `[0, available]` for its topic. The function is pure.
///
/// # Errors
///
/// Returns `AllocationError::InsufficientPool` when `target` exceeds the
/// combined pool. Callers should surface this as a configuration error before
/// creating an attempt; use [`allocate_saturating`] to accept under-delivery
/// instead.
pub fn allocate(topics: &[Topic], target: u32) -> Result<Allocation, AllocationError> {
    let available: u64 = topics
        .iter()
        .map(|t| u64::from(t.available_questions()))
        .sum();

    if u64::from(target) > available {
        return Err(AllocationError::InsufficientPool {
            requested: target,
            available,
        });
    }

    Ok(distribute(topics, target))
}

/// Like [`allocate`], but an over-sized target fills every topic to capacity
/// instead of failing. The returned allocation then sums to the pool size,
/// not to `target`.
#[must_use]
pub fn allocate_saturating(topics: &[Topic], target: u32) -> Allocation {
    match allocate(topics, target) {
        Ok(allocation) => allocation,
        Err(AllocationError::InsufficientPool { .. }) => {
            let entries = topics
                .iter()
                .filter(|t| !t.is_empty())
                .map(|t| TopicAllocation {
                    topic_id: t.id(),
                    count: t.available_questions(),
                    percent: display_percent(t.available_questions(), target),
                })
                .collect();
            Allocation { entries }
        }
    }
}

fn distribute(topics: &[Topic], target: u32) -> Allocation {
    let mut shares: Vec<Share> = topics
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_empty())
        .map(|(index, t)| Share {
            index,
            topic_id: t.id(),
            available: t.available_questions(),
            count: 0,
            remainder: 0.0,
        })
        .collect();

    if target == 0 || shares.is_empty() {
        return Allocation::default();
    }

    let pool: u64 = shares.iter().map(|s| u64::from(s.available)).sum();
    #[allow(clippy::cast_precision_loss)]
    let pool_f = pool as f64;

    for share in &mut shares {
        let exact = f64::from(target) * f64::from(share.available) / pool_f;
        let floor = exact.floor();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let count = (floor as u32).min(share.available);
        share.count = count;
        share.remainder = exact - floor;
    }

    // Hand out the units lost to flooring, largest fractional remainder first.
    let assigned: u32 = shares.iter().map(|s| s.count).sum();
    let mut deficit = target.saturating_sub(assigned);

    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        shares[b]
            .remainder
            .partial_cmp(&shares[a].remainder)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                shares[b]
                    .remaining_capacity()
                    .cmp(&shares[a].remaining_capacity()),
            )
            .then(shares[a].index.cmp(&shares[b].index))
    });

    while deficit > 0 {
        let mut progressed = false;
        for &i in &order {
            if deficit == 0 {
                break;
            }
            if shares[i].remaining_capacity() > 0 {
                shares[i].count += 1;
                deficit -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    reconcile(&mut shares, target);

    shares.sort_by_key(|s| s.index);
    let entries = shares
        .into_iter()
        .filter(|s| s.count > 0)
        .map(|s| TopicAllocation {
            topic_id: s.topic_id,
            count: s.count,
            percent: display_percent(s.count, target),
        })
        .collect();

    Allocation { entries }
}

// Safety net for residual floating-point drift: nudge the largest allocations
// one unit at a time until the sum matches the target, staying within each
// topic's capacity.
fn reconcile(shares: &mut [Share], target: u32) {
    loop {
        let sum: u32 = shares.iter().map(|s| s.count).sum();
        if sum == target {
            return;
        }

        let adjusted = if sum < target {
            shares
                .iter_mut()
                .filter(|s| s.remaining_capacity() > 0)
                .max_by_key(|s| s.count)
                .map(|s| s.count += 1)
        } else {
            shares
                .iter_mut()
                .filter(|s| s.count > 0)
                .max_by_key(|s| s.count)
                .map(|s| s.count -= 1)
        };

        if adjusted.is_none() {
            return;
        }
    }
}

fn display_percent(count: u32, target: u32) -> u32 {
    if target == 0 {
        return 0;
    }
    let scaled = f64::from(count) * 100.0 / f64::from(target);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        scaled.round() as u32
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
