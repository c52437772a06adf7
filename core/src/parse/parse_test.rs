use super::{criterion, custom, load_suite, pytest};
use crate::result::Tool;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const PYTEST_OUTPUT: &str = r#"{
  "machine_info": {"node": "runner"},
  "benchmarks": [
    {
      "group": null,
      "name": "test_create_events",
      "fullname": "tests/benchmark_otanalytics.py::TestProfile::test_create_events",
      "stats": {"min": 1.1, "max": 1.5, "mean": 1.25, "stddev": 0.125, "rounds": 5, "median": 1.2, "ops": 0.8}
    },
    {
      "name": "test_tracks_intersecting_sections",
      "stats": {"mean": 0.5}
    }
  ],
  "datetime": "2024-05-24T00:30:00.000000",
  "version": "4.0.0"
}"#;

#[test]
fn pytest_uses_fullname_and_mean_seconds() {
    let results = pytest::parse(PYTEST_OUTPUT).unwrap();
    assert_eq!(results.len(), 2);

    let first = &results[0];
    assert_eq!(first.name, "tests/benchmark_otanalytics.py::TestProfile::test_create_events");
    assert_eq!(first.value, 1.25);
    assert_eq!(first.unit, "s");
    assert_eq!(first.range.as_deref(), Some("± 0.125000"));
    let extra = first.extra.as_deref().unwrap();
    assert!(extra.contains("rounds: 5"));
    assert!(extra.contains("median: 1.200000 s"));

    let second = &results[1];
    assert_eq!(second.name, "test_tracks_intersecting_sections");
    assert!(second.range.is_none());
    assert!(second.extra.is_none());
}

#[test]
fn pytest_rejects_missing_benchmarks_key() {
    assert!(pytest::parse(r#"{"machine_info": {}}"#).is_err());
}

#[test]
fn custom_array_round_trips_optional_fields() {
    let data = r#"[
        {"name": "parse", "unit": "ms", "value": 12.5, "range": "± 0.3"},
        {"name": "throughput", "unit": "ops/s", "value": 900, "extra": "warm"}
    ]"#;
    let results = custom::parse(data).unwrap();
    assert_eq!(results[0].range.as_deref(), Some("± 0.3"));
    assert_eq!(results[1].value, 900.0);
    assert_eq!(results[1].extra.as_deref(), Some("warm"));
    assert!(custom::parse(r#"{"name": "x"}"#).is_err());
}

fn write_case(root: &Path, case: &str, mean: f64, raw: Option<&str>) {
    let new_dir = root.join(case).join("new");
    fs::create_dir_all(&new_dir).unwrap();
    fs::write(
        new_dir.join("estimates.json"),
        format!(
            r#"{{"mean":{{"point_estimate":{mean}}},"median":{{"point_estimate":{mean}}},"std_dev":{{"point_estimate":2.5}}}}"#
        ),
    )
    .unwrap();
    if let Some(raw) = raw {
        fs::write(new_dir.join("raw.csv"), raw).unwrap();
    }
}

#[test]
fn criterion_walks_groups_and_skips_reports() {
    let dir = tempdir().unwrap();
    let raw = "group,function,value,throughput_num,throughput_type,sample_measured_value,unit,iteration_count\n\
               g,f,,,,100,ns,10\n\
               g,f,,,,300,ns,10\n\
               g,f,,,,200,ns,10\n";
    write_case(dir.path(), "compare/small", 10.0, Some(raw));
    write_case(dir.path(), "compare/large", 40.0, None);
    write_case(dir.path(), "standalone", 7.0, None);
    fs::create_dir_all(dir.path().join("report")).unwrap();
    fs::write(dir.path().join("report").join("index.html"), "<html></html>").unwrap();

    let results = criterion::load_dir(dir.path()).unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["compare/large", "compare/small", "standalone"]);

    let small = &results[1];
    assert_eq!(small.value, 10.0);
    assert_eq!(small.unit, "ns");
    assert_eq!(small.range.as_deref(), Some("± 2.500"));
    let extra = small.extra.as_deref().unwrap();
    assert!(extra.contains("p50: 20.000 ns"), "unexpected extra: {}", extra);
    assert!(results[0].extra.is_none());
}

#[cfg(unix)]
#[test]
fn criterion_does_not_follow_symlinked_dirs() {
    let dir = tempdir().unwrap();
    write_case(dir.path(), "group/case", 5.0, None);
    std::os::unix::fs::symlink(dir.path(), dir.path().join("group").join("loop")).unwrap();

    let results = criterion::load_dir(dir.path()).unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["group/case"]);
}

#[test]
fn criterion_requires_directory() {
    let dir = tempdir().unwrap();
    assert!(criterion::load_dir(&dir.path().join("missing")).is_err());
}

#[test]
fn quantile_interpolates() {
    let sorted = [1.0, 2.0, 3.0, 4.0];
    assert_eq!(criterion::quantile(&sorted, 0.0), 1.0);
    assert_eq!(criterion::quantile(&sorted, 1.0), 4.0);
    assert!((criterion::quantile(&sorted, 0.5) - 2.5).abs() < 1e-12);
    assert_eq!(criterion::quantile(&[], 0.5), 0.0);
    assert!(criterion::parse_sample_value("a,b,c").is_err());
}

#[test]
fn load_suite_rejects_duplicates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.json");
    fs::write(
        &path,
        r#"[{"name": "a", "unit": "s", "value": 1}, {"name": "a", "unit": "s", "value": 2}]"#,
    )
    .unwrap();
    let err = load_suite(Tool::CustomSmallerIsBetter, &path).unwrap_err();
    assert!(format!("{:#}", err).contains("duplicate benchmark name 'a'"));
}

#[test]
fn load_suite_reports_missing_file() {
    let dir = tempdir().unwrap();
    let err = load_suite(Tool::Pytest, &dir.path().join("output.json")).unwrap_err();
    assert!(err.to_string().contains("output.json"));
}
