use std::fs;
use std::path::{Path, PathBuf};
use triage_core::{
    alert_files, load_alert, load_dir, LoadError, ScoreMethod, SelectionPolicy, Selector,
};

const ALERT_JSON: &str = r#"{
    "timestamp": "2025-06-20T15:29:26.118Z",
    "update_count": 42,
    "nodes_in_graph": 318,
    "node_anomalies": [
        {"ip": "192.168.10.4", "recon_error": 10.0, "mlp_score": 0.05, "detected_by": "recon_error"},
        {"ip": "192.168.10.77", "recon_error": 2.1, "mlp_score": 0.91, "detected_by": "mlp"},
        {"ip": "10.20.0.9", "recon_error": 16.4, "mlp_score": 0.7, "detected_by": "both"}
    ]
}"#;

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

// ============ LOADER TESTS ============

#[test]
fn test_load_valid_alert() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "alert_20250620_152926.json", ALERT_JSON);

    let doc = load_alert(&path).unwrap();

    assert_eq!(doc.timestamp, "2025-06-20T15:29:26.118Z");
    assert_eq!(doc.update_count, 42);
    assert_eq!(doc.nodes_in_graph, 318);
    assert_eq!(doc.node_anomalies.len(), 3);
    assert_eq!(doc.source_file, "alert_20250620_152926.json");
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_alert(dir.path().join("nope.json"));
    assert!(matches!(result, Err(LoadError::Io(_))));
}

#[test]
fn test_load_broken_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "broken.json", "{\"timestamp\": ");

    let err = load_alert(&path).unwrap_err();
    assert!(matches!(err, LoadError::Decode(_)));
    assert!(err.to_string().starts_with("invalid alert JSON"));
}

#[test]
fn test_load_wrong_field_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "typed.json",
        r#"{"timestamp": "t", "update_count": "many", "nodes_in_graph": 1, "node_anomalies": []}"#,
    );
    assert!(matches!(load_alert(&path), Err(LoadError::Decode(_))));
}

#[test]
fn test_load_dir_skips_bad_and_non_json() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "alert_20250620_152926.json", ALERT_JSON);
    write(dir.path(), "alert_20250620_160000.json", "not json at all");
    write(dir.path(), "notes.txt", ALERT_JSON);

    let docs = load_dir(dir.path()).unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].source_file, "alert_20250620_152926.json");
}

#[test]
fn test_alert_files_sorted_json_only() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "alert_20250620_160000.json", ALERT_JSON);
    write(dir.path(), "alert_20250620_152926.json", ALERT_JSON);
    write(dir.path(), "notes.txt", "");
    fs::create_dir(dir.path().join("archive.json")).unwrap();

    let names: Vec<String> = alert_files(dir.path())
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["alert_20250620_152926.json", "alert_20250620_160000.json"]);
}

// ============ SELECTION OVER A LOADED ALERT ============

#[test]
fn test_top_one_weighted() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "alert_20250620_152926.json", ALERT_JSON);
    let doc = load_alert(&path).unwrap();

    let selector = Selector::new(ScoreMethod::Weighted, SelectionPolicy::TopN { n: 1 });
    let picked = selector.select(std::slice::from_ref(&doc));

    assert_eq!(picked.len(), 1);
    assert_eq!(picked[0].ip, "10.20.0.9");
    assert!((picked[0].composite_score - (0.8 * 16.4 + 4.0 * 0.7)).abs() < 1e-9);
}

#[test]
fn test_max_method_changes_ranking() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "alert_20250620_152926.json", ALERT_JSON);
    let doc = load_alert(&path).unwrap();

    let selector = Selector::new(ScoreMethod::Max, SelectionPolicy::Threshold { cutoff: 0.9 });
    let picked = selector.select(std::slice::from_ref(&doc));
    let ips: Vec<_> = picked.iter().map(|n| n.ip.as_str()).collect();

    // 10.20.0.9 saturates at 1.0, 192.168.10.77 wins on mlp 0.91, 192.168.10.4 is 0.667
    assert_eq!(ips, vec!["10.20.0.9", "192.168.10.77"]);
}
