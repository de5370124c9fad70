//! Unit tests for XML configuration loading

use std::path::PathBuf;

use tempfile::TempDir;
use tsql_compat::capture::Status;
use tsql_compat::config::load_config;

fn write_config(dir: &TempDir, xml: &str) -> PathBuf {
    let path = dir.path().join("compass.xml");
    std::fs::write(&path, xml).unwrap();
    path
}

#[test]
fn test_full_config() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"<?xml version="1.0" encoding="utf-8"?>
<CompassConfig>
  <TargetVersion>2.1</TargetVersion>
  <MaxLineNrsInList>5</MaxLineNrsInList>
  <SortBufferBytes>65536</SortBufferBytes>
  <WeightFactors>
    <Weight Group="DML" Value="300" />
  </WeightFactors>
  <GroupOrder>
    <Group Name="Cursors" Rank="1" />
  </GroupOrder>
  <Rules>
    <Keyword Word="merge" Item="MERGE" Group="DML" Status="Review Semantics" />
    <Keyword Word="BULK" Group="Bulk load" Status="NOTSUPPORTED" />
    <Datatype Name="XML" Status="Supported" />
  </Rules>
</CompassConfig>"#,
    );

    let config = load_config(&path).unwrap();
    assert_eq!(config.target_version, "2.1");
    assert_eq!(config.max_line_nrs_in_list, 5);
    assert_eq!(config.sort_buffer_bytes, 65536);
    assert_eq!(config.group_weights.get("DML"), Some(&300));
    assert_eq!(config.group_ranks.get("Cursors"), Some(&1));

    let merge = config.keyword_rule("MERGE").unwrap();
    assert_eq!(merge.status, Status::ReviewSemantics);
    assert_eq!(config.keyword_rule("bulk").unwrap().item, "BULK");
    assert_eq!(config.datatype_status("XML"), Status::Supported);
    assert_eq!(config.datatype_status("GEOGRAPHY"), Status::NotSupported);
}

#[test]
fn test_empty_config_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "<CompassConfig/>");
    let config = load_config(&path).unwrap();
    assert_eq!(config.target_version, "1.0");
    assert_eq!(config.max_line_nrs_in_list, 10);
    assert!(config.keyword_rule("MERGE").is_some());
}

#[test]
fn test_invalid_configs_rejected() {
    let dir = TempDir::new().unwrap();
    let cases = [
        "<Settings/>",
        "<CompassConfig><Rules><Keyword Word=\"X\" Group=\"G\" Status=\"Maybe\"/></Rules></CompassConfig>",
        "<CompassConfig><WeightFactors><Weight Group=\"G\" Value=\"5000\"/></WeightFactors></CompassConfig>",
        "<CompassConfig><GroupOrder><Group Name=\"G\" Rank=\"1000\"/></GroupOrder></CompassConfig>",
        "<CompassConfig><MaxLineNrsInList>0</MaxLineNrsInList></CompassConfig>",
        "<CompassConfig><Rules><Datatype Name=\"XML\"/></Rules></CompassConfig>",
        "<CompassConfig>",
    ];
    for xml in cases {
        let path = write_config(&dir, xml);
        assert!(load_config(&path).is_err(), "config should be rejected: {}", xml);
    }
}

#[test]
fn test_missing_config_file() {
    let err = load_config(&PathBuf::from("/nonexistent/compass.xml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read configuration file"));
}
