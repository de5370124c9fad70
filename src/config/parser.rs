//! Parser for `<CompassConfig>` XML configuration files

use std::path::Path;

use anyhow::Result;
use roxmltree::{Document, Node};

use super::{CompassConfig, DatatypeRule, KeywordRule};
use crate::capture::Status;
use crate::error::CompassError;

const MAX_GROUP_RANK: u32 = 999;
const MAX_WEIGHT: u32 = 1000;
const MIN_SORT_BUFFER_BYTES: usize = 1024;

/// Load a configuration file, starting from the built-in defaults.
///
/// Elements that are absent keep their default; rules in the file are
/// added to (or replace) the built-in rules.
pub fn load_config(path: &Path) -> Result<CompassConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CompassError::ConfigReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let doc = Document::parse(&content).map_err(|e| CompassError::ConfigParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "CompassConfig" {
        return Err(invalid(format!(
            "expected root element <CompassConfig>, found <{}>",
            root.tag_name().name()
        )));
    }

    let mut config = CompassConfig::default();

    if let Some(version) = find_property_value(&root, "TargetVersion") {
        if version.is_empty() || version.contains(['[', ']']) {
            return Err(invalid(format!("invalid TargetVersion '{}'", version)));
        }
        config.target_version = version;
    }

    if let Some(value) = find_property_value(&root, "MaxLineNrsInList") {
        config.max_line_nrs_in_list = parse_number(&value, "MaxLineNrsInList")?;
        if config.max_line_nrs_in_list == 0 {
            return Err(invalid("MaxLineNrsInList must be at least 1".to_string()));
        }
    }

    if let Some(value) = find_property_value(&root, "SortBufferBytes") {
        config.sort_buffer_bytes = parse_number(&value, "SortBufferBytes")?;
        if config.sort_buffer_bytes < MIN_SORT_BUFFER_BYTES {
            return Err(invalid(format!(
                "SortBufferBytes must be at least {}",
                MIN_SORT_BUFFER_BYTES
            )));
        }
    }

    for node in elements_named(&root, "Weight") {
        let group = required_attribute(&node, "Group")?;
        let value: u32 = parse_number(&required_attribute(&node, "Value")?, "Weight Value")?;
        if value > MAX_WEIGHT {
            return Err(invalid(format!(
                "weight {} for group '{}' exceeds {}",
                value, group, MAX_WEIGHT
            )));
        }
        config.group_weights.insert(group, value);
    }

    for node in elements_named(&root, "Group") {
        let name = required_attribute(&node, "Name")?;
        let rank: u32 = parse_number(&required_attribute(&node, "Rank")?, "Group Rank")?;
        if rank > MAX_GROUP_RANK {
            return Err(invalid(format!(
                "rank {} for group '{}' exceeds {}",
                rank, name, MAX_GROUP_RANK
            )));
        }
        config.group_ranks.insert(name, rank);
    }

    for node in elements_named(&root, "Keyword") {
        let word = required_attribute(&node, "Word")?;
        let item = node
            .attribute("Item")
            .map(str::to_string)
            .unwrap_or_else(|| word.to_uppercase());
        config.set_keyword_rule(KeywordRule {
            item,
            group: required_attribute(&node, "Group")?,
            status: parse_status(&node)?,
            word,
        });
    }

    for node in elements_named(&root, "Datatype") {
        config.set_datatype_rule(DatatypeRule {
            name: required_attribute(&node, "Name")?,
            status: parse_status(&node)?,
        });
    }

    Ok(config)
}

fn find_property_value(root: &Node, property_name: &str) -> Option<String> {
    for node in root.descendants() {
        if node.tag_name().name() == property_name {
            return node.text().map(|s| s.trim().to_string());
        }
    }
    None
}

fn elements_named<'a, 'input>(
    root: &Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    root.descendants()
        .filter(move |node| node.is_element() && node.tag_name().name() == name)
}

fn required_attribute(node: &Node, name: &str) -> Result<String> {
    node.attribute(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            invalid(format!(
                "<{}> element is missing the '{}' attribute",
                node.tag_name().name(),
                name
            ))
        })
}

fn parse_status(node: &Node) -> Result<Status> {
    let value = required_attribute(node, "Status")?;
    value.parse::<Status>().map_err(|_| {
        invalid(format!(
            "unknown status '{}' in <{}> element",
            value,
            node.tag_name().name()
        ))
    })
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| invalid(format!("{} must be a number, found '{}'", what, value)))
}

fn invalid(message: String) -> anyhow::Error {
    CompassError::InvalidConfig { message }.into()
}
