//! Report section generation from a [`ReportAggregate`].

use std::io::Write;

use anyhow::Result;

use super::format::{align_columns, anchor, bar, plural};
use super::writer::ReportWriter;
use crate::aggregate::{
    collapse_line_numbers, scan_by_feature, scan_by_object, FeatureXrefLine, ObjectXrefLine,
    ReportAggregate, StatusSection, XrefOptions,
};
use crate::capture::Status;

const SETUP: &str = "Report setup";
const APPLICATIONS: &str = "Applications analyzed";
const SUMMARY: &str = "Assessment summary";
const ESTIMATE: &str = "Compatibility estimate";
const OBJECTS: &str = "Object count";
const XREF_FEATURE: &str = "Cross-reference by feature";
const XREF_OBJECT: &str = "Cross-reference by object";

/// Presentation settings of one report run.
#[derive(Debug, Clone, Default)]
pub struct ReportSettings {
    pub xref: XrefOptions,
    /// Per-application counts in the status summaries
    pub show_app_counts: bool,
    pub generated_at: String,
}

/// What the cross-reference lines need to show beyond the context.
#[derive(Debug, Clone, Copy)]
struct Spread {
    multi_app: bool,
    multi_file: bool,
}

fn status_title(status: Status) -> String {
    format!("SQL features '{}'", status.display_name())
}

/// Write all report sections in order.
pub fn write_report<T: Write, H: Write>(
    aggregate: &mut ReportAggregate,
    settings: &ReportSettings,
    out: &mut ReportWriter<T, H>,
) -> Result<()> {
    write_setup(aggregate, settings, out)?;
    write_toc(out)?;
    write_applications(aggregate, out)?;
    write_summary_counts(aggregate, out)?;
    write_estimate(aggregate, out)?;
    write_object_counts(aggregate, out)?;

    out.blank()?;
    out.line(&bar('='))?;
    out.line("=== SQL Features Report ===")?;
    out.line(&bar('='))?;
    for status in Status::REPORT_ORDER {
        let section = aggregate.summary.iter().find(|s| s.status == status);
        write_status_summary(status, section, settings, out)?;
    }

    let spread = Spread {
        multi_app: aggregate.apps.len() > 1,
        multi_file: aggregate.totals.files > 1,
    };
    write_feature_xref(aggregate, settings, spread, out)?;
    write_object_xref(aggregate, settings, spread, out)?;
    Ok(())
}

fn write_setup<T: Write, H: Write>(
    aggregate: &ReportAggregate,
    settings: &ReportSettings,
    out: &mut ReportWriter<T, H>,
) -> Result<()> {
    out.section(SETUP, &anchor(SETUP))?;
    let xref = &settings.xref;
    let xref_kinds = match (xref.by_feature, xref.by_object) {
        (true, true) => "by feature, by object",
        (true, false) => "by feature",
        (false, true) => "by object",
        (false, false) => "none",
    };
    let mut rows = vec![
        ("Report name".to_string(), aggregate.report_name.clone()),
        ("Target version".to_string(), aggregate.target_version.clone()),
        ("Generated at".to_string(), settings.generated_at.clone()),
        ("Tool version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
        ("Capture files".to_string(), aggregate.capture_files.to_string()),
        ("Cross-references".to_string(), xref_kinds.to_string()),
    ];
    if xref.enabled() {
        let statuses: Vec<&str> = xref.statuses.iter().map(|s| s.display_name()).collect();
        rows.push(("X-ref statuses".to_string(), statuses.join(", ")));
        rows.push(("Max line numbers".to_string(), xref.max_line_nrs.to_string()));
    }
    if let Some(filter) = &xref.filter {
        rows.push((
            "X-ref filter".to_string(),
            filter.as_str().trim_start_matches("(?i)").to_string(),
        ));
    }
    for line in align_columns(&rows) {
        out.line(&line)?;
    }
    Ok(())
}

fn write_toc<T: Write, H: Write>(out: &mut ReportWriter<T, H>) -> Result<()> {
    for title in [APPLICATIONS, SUMMARY, ESTIMATE, OBJECTS] {
        out.toc_link(title, &anchor(title))?;
    }
    for status in Status::REPORT_ORDER {
        let title = status_title(status);
        out.toc_link(&title, &anchor(&title))?;
    }
    out.toc_link(XREF_FEATURE, &anchor(XREF_FEATURE))?;
    out.toc_link(XREF_OBJECT, &anchor(XREF_OBJECT))?;
    Ok(())
}

fn totals_text(files: u64, batches: u64, error_batches: u64, lines: u64) -> String {
    let mut text = format!(
        "{}, {}, {} SQL",
        plural(files, "file"),
        plural(batches, "batch"),
        plural(lines, "line")
    );
    if error_batches > 0 {
        text.push_str(&format!(" ({} with errors)", plural(error_batches, "batch")));
    }
    text
}

fn write_applications<T: Write, H: Write>(
    aggregate: &ReportAggregate,
    out: &mut ReportWriter<T, H>,
) -> Result<()> {
    out.section(APPLICATIONS, &anchor(APPLICATIONS))?;
    out.line(&format!("Applications: {}", aggregate.apps.len()))?;
    out.blank()?;
    let rows: Vec<(String, String)> = aggregate
        .apps
        .iter()
        .map(|(app, t)| {
            (
                app.clone(),
                totals_text(t.files, t.batches, t.error_batches, t.lines),
            )
        })
        .collect();
    for line in align_columns(&rows) {
        out.line(&format!("  {}", line))?;
    }
    let t = &aggregate.totals;
    out.blank()?;
    out.line(&format!(
        "Total: {}",
        totals_text(t.files, t.batches, t.error_batches, t.lines)
    ))?;
    Ok(())
}

fn write_summary_counts<T: Write, H: Write>(
    aggregate: &ReportAggregate,
    out: &mut ReportWriter<T, H>,
) -> Result<()> {
    out.section(SUMMARY, &anchor(SUMMARY))?;
    let mut rows: Vec<(String, String)> = Status::REPORT_ORDER
        .iter()
        .map(|status| {
            let count = aggregate.status_counts.get(status).copied().unwrap_or(0);
            (status.display_name().to_string(), count.to_string())
        })
        .collect();
    rows.push(("Total constructs".to_string(), aggregate.constructs.to_string()));
    for line in align_columns(&rows) {
        out.line(&line)?;
    }
    Ok(())
}

fn write_estimate<T: Write, H: Write>(
    aggregate: &ReportAggregate,
    out: &mut ReportWriter<T, H>,
) -> Result<()> {
    out.section(ESTIMATE, &anchor(ESTIMATE))?;
    out.line(&format!(
        "Estimated compatibility with target version {} : {}",
        aggregate.target_version, aggregate.score
    ))?;
    Ok(())
}

fn write_object_counts<T: Write, H: Write>(
    aggregate: &ReportAggregate,
    out: &mut ReportWriter<T, H>,
) -> Result<()> {
    out.section(OBJECTS, &anchor(OBJECTS))?;
    if aggregate.objects.is_empty() {
        out.line("No objects created.")?;
        return Ok(());
    }
    let rows: Vec<(String, String)> = aggregate
        .objects
        .iter()
        .map(|object| {
            let mut value = object.count.to_string();
            if object.lines > 0 {
                value.push_str(&format!(" ({} SQL)", plural(object.lines, "line")));
            }
            if let Some((free, total)) = object.issue_free {
                value.push_str(&format!(", {} of {} without issues", free, total));
            }
            (object.kind.clone(), value)
        })
        .collect();
    for line in align_columns(&rows) {
        out.line(&line)?;
    }
    Ok(())
}

fn write_status_summary<T: Write, H: Write>(
    status: Status,
    section: Option<&StatusSection>,
    settings: &ReportSettings,
    out: &mut ReportWriter<T, H>,
) -> Result<()> {
    let title = status_title(status);
    out.section(&title, &anchor(&title))?;
    let Some(section) = section else {
        out.line(&format!("No items with status '{}'.", status.display_name()))?;
        return Ok(());
    };

    out.line(&format!("Total: {}", section.total))?;
    for group in &section.groups {
        out.blank()?;
        out.line(&format!("{} ({}/{})", group.group, group.total, group.distinct()))?;
        let rows: Vec<(String, String)> = group
            .items
            .iter()
            .map(|item| {
                let mut value = item.count.to_string();
                if settings.show_app_counts {
                    let apps: Vec<String> = item
                        .app_counts
                        .iter()
                        .map(|(app, n)| format!("{}({})", app, n))
                        .collect();
                    value.push_str(&format!("  #apps={}: {}", apps.len(), apps.join(", ")));
                }
                (format!("    {}", item.item), value)
            })
            .collect();
        for line in align_columns(&rows) {
            out.line(&line)?;
        }
    }
    Ok(())
}

// ============================================================================
// Cross-references
// ============================================================================

fn location_suffix(app: &str, src_file: &str, batch_nr: Option<u32>, spread: Spread) -> String {
    let mut parts = Vec::new();
    if spread.multi_app {
        parts.push(format!("app: {}", app));
    }
    if spread.multi_file {
        parts.push(format!("file: {}", src_file));
    }
    if let Some(nr) = batch_nr {
        parts.push(format!("batch {}", nr));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join(", "))
    }
}

fn write_disabled<T: Write, H: Write>(
    out: &mut ReportWriter<T, H>,
    kind: &str,
    option: &str,
) -> Result<()> {
    out.line(&format!("Cross-reference by {} not generated.", kind))?;
    out.line(&format!(
        "Use report option 'xref' or 'xref={}' to enable it; add 'status=all' to include all statuses.",
        option
    ))?;
    Ok(())
}

fn write_filtered<T: Write, H: Write>(
    aggregate: &ReportAggregate,
    options: &XrefOptions,
    out: &mut ReportWriter<T, H>,
) -> Result<()> {
    if let Some(filter) = &options.filter {
        out.line(&format!(
            "Filter '{}' applied: {} skipped.",
            filter.as_str().trim_start_matches("(?i)"),
            plural(aggregate.xref_filtered, "item")
        ))?;
    }
    Ok(())
}

fn write_status_heading<T: Write, H: Write>(
    out: &mut ReportWriter<T, H>,
    status: Status,
) -> Result<()> {
    out.blank()?;
    out.line(&format!("=== {} ===", status.display_name()))
}

fn write_feature_xref<T: Write, H: Write>(
    aggregate: &mut ReportAggregate,
    settings: &ReportSettings,
    spread: Spread,
    out: &mut ReportWriter<T, H>,
) -> Result<()> {
    out.section(XREF_FEATURE, &anchor(XREF_FEATURE))?;
    let Some(keys) = aggregate.feature_xref.take() else {
        return write_disabled(out, "feature", "feature");
    };
    write_filtered(aggregate, &settings.xref, out)?;

    let max = settings.xref.max_line_nrs;
    let mut previous: Option<FeatureXrefLine> = None;
    let mut lines = 0u64;
    scan_by_feature(keys, &aggregate.files, &settings.xref, |line| {
        let new_status = previous.as_ref().map_or(true, |p| p.status != line.status);
        if new_status {
            write_status_heading(out, line.status)?;
        }
        let new_item = new_status
            || previous
                .as_ref()
                .map_or(true, |p| p.group != line.group || p.item != line.item);
        if new_item {
            out.line(&format!("{} ({})", line.item, line.group))?;
        }
        let sub_context = if line.sub_context.is_empty() {
            String::new()
        } else {
            format!(", {}", line.sub_context)
        };
        out.line(&format!(
            "    {}{}{} : {}",
            line.context,
            sub_context,
            location_suffix(&line.app, &line.src_file, line.batch_nr, spread),
            collapse_line_numbers(&line.line_nrs, max)
        ))?;
        lines += 1;
        previous = Some(line);
        Ok(())
    })?;

    if lines == 0 {
        out.line("No items to cross-reference.")?;
    }
    Ok(())
}

fn write_object_xref<T: Write, H: Write>(
    aggregate: &mut ReportAggregate,
    settings: &ReportSettings,
    spread: Spread,
    out: &mut ReportWriter<T, H>,
) -> Result<()> {
    out.section(XREF_OBJECT, &anchor(XREF_OBJECT))?;
    let Some(keys) = aggregate.object_xref.take() else {
        return write_disabled(out, "object", "object");
    };
    write_filtered(aggregate, &settings.xref, out)?;

    let max = settings.xref.max_line_nrs;
    let mut previous: Option<ObjectXrefLine> = None;
    let mut lines = 0u64;
    scan_by_object(keys, &aggregate.files, &settings.xref, |line| {
        let new_status = previous.as_ref().map_or(true, |p| p.status != line.status);
        if new_status {
            write_status_heading(out, line.status)?;
        }
        let new_object = new_status
            || previous.as_ref().map_or(true, |p| {
                p.context != line.context
                    || p.app != line.app
                    || p.src_file != line.src_file
                    || p.batch_nr != line.batch_nr
            });
        if new_object {
            out.line(&format!(
                "{}{}",
                line.context,
                location_suffix(&line.app, &line.src_file, line.batch_nr, spread)
            ))?;
        }
        out.line(&format!(
            "    {} ({}) : {}",
            line.item,
            line.group,
            collapse_line_numbers(&line.line_nrs, max)
        ))?;
        lines += 1;
        previous = Some(line);
        Ok(())
    })?;

    if lines == 0 {
        out.line("No items to cross-reference.")?;
    }
    Ok(())
}
