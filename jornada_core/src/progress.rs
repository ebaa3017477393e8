//! Completion arithmetic shared by the project and event trackers.
//!
//! Percentages are whole numbers rounded half up, matching what learners see
//! on a progress bar. A curriculum with no steps counts as 0 % everywhere.

use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// A step is complete once its progress reaches this value.
pub const COMPLETE: i32 = 100;

/// `round(100 * completed / total)`, rounded half up and clamped to 100.
pub fn completion_percent(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((200 * completed + total) / (2 * total)) as u8
}

/// Rounded mean of per-curriculum percentages; 0 when there are none.
pub fn overall_percent<I>(percents: I) -> u8
where
    I: IntoIterator<Item = u8>,
{
    let (sum, count) = percents
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), p| (sum + u64::from(p), count + 1));
    if count == 0 {
        return 0;
    }
    ((2 * sum + count) / (2 * count)) as u8
}

/// Share of a capacity already taken, capped at 100. `None` when unlimited.
pub fn fill_percent(taken: u64, capacity: Option<i32>) -> Option<u8> {
    let capacity = u64::try_from(capacity?).ok().filter(|c| *c > 0)?;
    Some(completion_percent(taken, capacity))
}

/// Counts the steps of `steps` that have a progression at or above
/// [`COMPLETE`]. Rows for unknown steps and duplicate rows are ignored.
pub fn completed_steps<K, S, P>(steps: S, progressions: P) -> u64
where
    K: Eq + Hash,
    S: IntoIterator<Item = K>,
    P: IntoIterator<Item = (K, i32)>,
{
    let steps: HashSet<K> = steps.into_iter().collect();
    let done: HashSet<K> = progressions
        .into_iter()
        .filter(|(step, num)| *num >= COMPLETE && steps.contains(step))
        .map(|(step, _)| step)
        .collect();
    done.len() as u64
}

/// Per-step view used by study pages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus<K> {
    pub content_id: K,
    pub title: String,
    pub progress_num: i32,
    pub done: bool,
}
