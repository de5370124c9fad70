//! Object-count rollup and per-object issue tracking.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::capture::{CaptureRecord, Status};
use crate::names::BATCH_CONTEXT;
use crate::util::cmp_ci;

/// Object kinds whose issue-free share is reported.
const TRACKED_KINDS: [&str; 5] = ["PROCEDURE", "FUNCTION", "TRIGGER", "VIEW", "TABLE"];

/// Count of created objects of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCount {
    pub kind: String,
    pub count: u64,
    /// Lines of SQL in the object bodies, when recorded
    pub lines: u64,
    /// `(issue_free, total)` for tracked kinds
    pub issue_free: Option<(u64, u64)>,
}

/// Accumulates object counts while records stream past.
#[derive(Debug, Default)]
pub struct ObjectRollup {
    counts: BTreeMap<String, (u64, u64)>,
    /// Object context label -> rollup label
    objects: HashMap<String, String>,
    with_issues: HashSet<String>,
}

impl ObjectRollup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: &CaptureRecord) {
        // Ignored objects are not counted
        let label = match record.status {
            Status::Ignored => None,
            _ => object_kind_label(&record.item),
        };
        if let Some(label) = label {
            if record.item.starts_with("CREATE ") && record.context != BATCH_CONTEXT {
                let context = record.context.to_uppercase();
                // A table created inside a procedure does not define the procedure
                let tracked = context.split(' ').next().is_some_and(|kind| {
                    TRACKED_KINDS.contains(&kind) && label.to_uppercase().starts_with(kind)
                });
                if tracked {
                    self.objects.insert(context, label.clone());
                }
            }

            let entry = self.counts.entry(label).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += record.misc.trim().parse::<u64>().unwrap_or(0);
        }

        if !matches!(
            record.status,
            Status::Supported | Status::Ignored | Status::ObjectCountOnly
        ) && record.context != BATCH_CONTEXT
        {
            self.with_issues.insert(record.context.to_uppercase());
        }
    }

    pub fn finish(self) -> Vec<ObjectCount> {
        let mut totals: HashMap<&str, (u64, u64)> = HashMap::new();
        for (context, kind) in &self.objects {
            let entry = totals.entry(kind.as_str()).or_insert((0, 0));
            entry.1 += 1;
            if !self.with_issues.contains(context) {
                entry.0 += 1;
            }
        }

        let mut result: Vec<ObjectCount> = self
            .counts
            .iter()
            .map(|(kind, (count, lines))| ObjectCount {
                kind: kind.clone(),
                count: *count,
                lines: *lines,
                issue_free: totals.get(kind.as_str()).copied(),
            })
            .collect();
        result.sort_by(|a, b| cmp_ci(&a.kind, &b.kind));
        result
    }
}

/// Rollup label for an item, or `None` if the item is not an object creation.
///
/// `CREATE PROCEDURE, ...` collapses to `PROCEDURE`, `CREATE TYPE` is
/// reported as a user-defined datatype, and `Constraint X` items count as
/// `constraint X` except column defaults and PRIMARY KEY/UNIQUE constraints.
pub fn object_kind_label(item: &str) -> Option<String> {
    if let Some(rest) = item.strip_prefix("CREATE ") {
        let parts: Vec<&str> = rest
            .split(',')
            .map(str::trim)
            .filter(|p| !p.eq_ignore_ascii_case("external") && !p.eq_ignore_ascii_case("CLUSTERED"))
            .collect();
        let kind = *parts.first()?;
        let label = match kind.to_uppercase().as_str() {
            "TYPE" => "user-defined datatype (UDD)".to_string(),
            "INDEX" => "index".to_string(),
            "PROCEDURE" | "TRIGGER" => kind.to_uppercase(),
            _ => parts.iter().take(2).copied().collect::<Vec<_>>().join(", "),
        };
        return Some(label);
    }
    if let Some(rest) = item.strip_prefix("Constraint ") {
        let upper = rest.to_uppercase();
        if upper.contains("DEFAULT") || upper.contains("PRIMARY KEY") || upper.contains("UNIQUE") {
            return None;
        }
        return Some(format!("constraint {}", rest));
    }
    None
}
