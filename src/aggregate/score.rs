//! Weighted compatibility score.

use std::collections::HashMap;
use std::fmt;

use crate::capture::Status;

/// Weight of a construct occurrence with no issue.
const BASE_WEIGHT: i64 = 100;

/// Score weights per status, with per-feature-group overrides.
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    group_overrides: HashMap<String, u32>,
}

impl WeightTable {
    pub fn with_overrides<'a>(overrides: impl IntoIterator<Item = (&'a String, &'a u32)>) -> Self {
        Self {
            group_overrides: overrides
                .into_iter()
                .map(|(group, weight)| (group.to_uppercase(), *weight))
                .collect(),
        }
    }

    /// Weight of one occurrence. Group overrides apply to every status that
    /// carries a weight (not to Supported or ObjectCountOnly).
    pub fn weight(&self, status: Status, group: &str) -> u32 {
        match status {
            Status::Supported | Status::ObjectCountOnly => status.default_weight(),
            _ => self
                .group_overrides
                .get(&group.to_uppercase())
                .copied()
                .unwrap_or_else(|| status.default_weight()),
        }
    }
}

/// Result of the score computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatibilityScore {
    /// Nothing to score
    NotApplicable,
    Percent {
        /// Displayed value, 0..=100
        value: u8,
        /// Value before clamping and the 99 cap
        raw: i64,
    },
}

impl fmt::Display for CompatibilityScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompatibilityScore::NotApplicable => f.write_str("Not Applicable"),
            CompatibilityScore::Percent { value, .. } => write!(f, "{}%", value),
        }
    }
}

/// Running totals for the score.
#[derive(Debug, Clone, Default)]
pub struct ScoreAccumulator {
    constructs: u64,
    attention_weight: u64,
    ignored_weight: u64,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, weights: &WeightTable, status: Status, group: &str) {
        match status {
            Status::ObjectCountOnly => return,
            Status::Ignored => self.ignored_weight += u64::from(weights.weight(status, group)),
            s if s.needs_attention() => {
                self.attention_weight += u64::from(weights.weight(status, group))
            }
            _ => {}
        }
        self.constructs += 1;
    }

    pub fn constructs(&self) -> u64 {
        self.constructs
    }

    pub fn attention_weight(&self) -> u64 {
        self.attention_weight
    }

    pub fn score(&self) -> CompatibilityScore {
        compute_score(self.constructs, self.attention_weight, self.ignored_weight)
    }
}

/// `((base - W) * 100) / base` with `base = constructs * 100 - ignored`,
/// clamped to `0..=100`; any non-zero `W` caps the result at 99.
pub fn compute_score(constructs: u64, attention_weight: u64, ignored_weight: u64) -> CompatibilityScore {
    if constructs == 0 {
        return CompatibilityScore::NotApplicable;
    }
    let base = constructs as i64 * BASE_WEIGHT - ignored_weight as i64;
    if base <= 0 {
        return CompatibilityScore::NotApplicable;
    }
    let raw = ((base - attention_weight as i64) * 100) / base;
    let mut value = raw.clamp(0, 100) as u8;
    if attention_weight > 0 && value == 100 {
        value = 99;
    }
    CompatibilityScore::Percent { value, raw }
}
