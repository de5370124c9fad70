//! Status summary: occurrence counts grouped by (status, feature group, item).

use std::collections::{BTreeMap, HashMap};

use super::sort_key::{
    group_from_sort_field, make_key, split_key, status_field, status_from_field, GroupOrder,
    LAST_ITEM,
};
use crate::capture::Status;
use crate::util::cmp_ci;

/// Count of one item, optionally broken down per application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCount {
    pub item: String,
    pub count: u64,
    /// `(app, count)` in case-insensitive app order
    pub app_counts: Vec<(String, u64)>,
}

/// All items of one feature group within a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureGroupSummary {
    pub group: String,
    pub total: u64,
    pub items: Vec<ItemCount>,
}

impl FeatureGroupSummary {
    /// Number of distinct items in the group.
    pub fn distinct(&self) -> usize {
        self.items.len()
    }
}

/// All feature groups of one status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSection {
    pub status: Status,
    pub total: u64,
    pub groups: Vec<FeatureGroupSummary>,
}

#[derive(Debug, Default)]
struct KeyCounts {
    count: u64,
    per_app: BTreeMap<String, u64>,
}

/// Collects summary keys; memory is bounded by the number of distinct items.
#[derive(Debug, Default)]
pub struct SummaryBuilder {
    counts: HashMap<String, KeyCounts>,
}

impl SummaryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, status: Status, group: &str, item: &str, app: &str, groups: &GroupOrder) {
        let key = make_key(&[&status_field(status), &groups.sort_field(group), item]);
        let entry = self.counts.entry(key).or_default();
        entry.count += 1;
        match entry.per_app.get_mut(app) {
            Some(n) => *n += 1,
            None => {
                entry.per_app.insert(app.to_string(), 1);
            }
        }
    }

    pub fn distinct_keys(&self) -> usize {
        self.counts.len()
    }

    /// Sort the keys and group them into status sections in report order.
    pub fn finish(self) -> Vec<StatusSection> {
        let mut counts = self.counts;
        let mut keys: Vec<String> = counts.keys().cloned().collect();
        keys.sort_by(|a, b| cmp_ci(a, b));
        keys.push(LAST_ITEM.to_string());

        let mut sections: Vec<StatusSection> = Vec::new();
        let mut section: Option<StatusSection> = None;
        let mut group: Option<FeatureGroupSummary> = None;

        for key in keys {
            let fields = split_key(&key);
            let parsed = match fields.as_slice() {
                [status, group_field, item] => {
                    status_from_field(status).map(|s| (s, group_from_sort_field(group_field), *item))
                }
                _ => None,
            };

            // Close the current group when its (status, group) prefix ends
            let group_changes = match (&section, &group, parsed) {
                (Some(sec), Some(grp), Some((status, name, _))) => {
                    sec.status != status || !grp.group.eq_ignore_ascii_case(name)
                }
                (_, Some(_), None) => true,
                _ => false,
            };
            if group_changes {
                if let (Some(sec), Some(grp)) = (section.as_mut(), group.take()) {
                    sec.total += grp.total;
                    sec.groups.push(grp);
                }
            }

            let section_changes = match (&section, parsed) {
                (Some(sec), Some((status, _, _))) => sec.status != status,
                (Some(_), None) => true,
                _ => false,
            };
            if section_changes {
                if let Some(done) = section.take() {
                    sections.push(done);
                }
            }

            let Some((status, group_name, item)) = parsed else {
                continue;
            };
            let Some(entry) = counts.remove(&key) else {
                continue;
            };

            let sec = section.get_or_insert_with(|| StatusSection {
                status,
                total: 0,
                groups: Vec::new(),
            });
            debug_assert_eq!(sec.status, status);
            let grp = group.get_or_insert_with(|| FeatureGroupSummary {
                group: group_name.to_string(),
                total: 0,
                items: Vec::new(),
            });
            grp.total += entry.count;
            let mut app_counts: Vec<(String, u64)> = entry.per_app.into_iter().collect();
            app_counts.sort_by(|a, b| cmp_ci(&a.0, &b.0));
            grp.items.push(ItemCount {
                item: item.to_string(),
                count: entry.count,
                app_counts,
            });
        }

        sections
    }
}
