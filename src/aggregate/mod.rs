//! Sort-merge aggregation of capture records into summaries, cross-references and a score.

pub mod engine;
pub mod external_sort;
pub mod objects;
pub mod score;
pub mod sort_key;
pub mod summary;
pub mod xref;

pub use engine::{aggregate_captures, AggregateOptions, Aggregator, InputTotals, ReportAggregate};
pub use external_sort::{ExternalSorter, SortedKeys};
pub use objects::{object_kind_label, ObjectCount, ObjectRollup};
pub use score::{compute_score, CompatibilityScore, ScoreAccumulator, WeightTable};
pub use sort_key::{GroupOrder, SourceFileMap};
pub use summary::{FeatureGroupSummary, ItemCount, StatusSection, SummaryBuilder};
pub use xref::{
    collapse_line_numbers, scan_by_feature, scan_by_object, FeatureXrefLine, ObjectXrefLine,
    XrefOptions,
};
