//! Report option strings, e.g. `xref=feature`, `status=all`, `filter=^MERGE`.

use anyhow::Result;

use super::generator::ReportSettings;
use crate::capture::Status;
use crate::error::CompassError;

/// Apply report options to `settings`, in order.
///
/// Options are case-insensitive except for filter patterns. Several
/// options may be given in one string separated by commas.
pub fn apply_report_options<S: AsRef<str>>(options: &[S], settings: &mut ReportSettings) -> Result<()> {
    let mut extra_statuses: Vec<Status> = Vec::new();
    for raw in options {
        for option in split_options(raw.as_ref()) {
            let (name, value) = match option.split_once('=') {
                Some((name, value)) => (name.trim(), Some(value.trim())),
                None => (option.trim(), None),
            };
            let xref = &mut settings.xref;
            match (name.to_ascii_lowercase().as_str(), value) {
                ("xref", None) => {
                    xref.by_feature = true;
                    xref.by_object = true;
                }
                ("xref", Some(kind)) if kind.eq_ignore_ascii_case("feature") => xref.by_feature = true,
                ("xref", Some(kind)) if kind.eq_ignore_ascii_case("object") => xref.by_object = true,
                ("status", Some(value)) if value.eq_ignore_ascii_case("all") => {
                    extra_statuses.extend(Status::REPORT_ORDER);
                }
                ("status", Some(value)) => extra_statuses.push(value.parse::<Status>()?),
                ("apps", None) => settings.show_app_counts = true,
                ("batchnr", None) => xref.show_batch_nr = true,
                ("detail", None) => xref.show_detail = true,
                ("filter", Some(pattern)) => xref.set_filter(pattern)?,
                ("maxlinenrs", Some(value)) => {
                    xref.max_line_nrs = value.parse::<usize>().ok().filter(|n| *n > 0).ok_or_else(|| {
                        CompassError::InvalidConfig {
                            message: format!("invalid maxLineNrs value '{}'", value),
                        }
                    })?;
                }
                _ => {
                    return Err(CompassError::InvalidConfig {
                        message: format!("unknown report option '{}'", option.trim()),
                    }
                    .into())
                }
            }
        }
    }

    for status in extra_statuses {
        if !settings.xref.statuses.contains(&status) {
            settings.xref.statuses.push(status);
        }
    }
    Ok(())
}

/// Split on commas, except inside a filter pattern, which runs to the end.
fn split_options(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = raw;
    while !rest.is_empty() {
        if rest.trim_start().to_ascii_lowercase().starts_with("filter=") {
            parts.push(rest);
            break;
        }
        match rest.split_once(',') {
            Some((head, tail)) => {
                parts.push(head);
                rest = tail;
            }
            None => {
                parts.push(rest);
                break;
            }
        }
    }
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}
