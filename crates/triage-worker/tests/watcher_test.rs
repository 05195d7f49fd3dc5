use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};
use triage_worker::config::WatchMode;
use triage_worker::{AlertWatcher, alert_queue};

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

// everything queued until nothing new arrives for `quiet`
async fn drain(rx: &mut UnboundedReceiver<PathBuf>, quiet: Duration) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    while let Ok(Some(path)) = timeout(quiet, rx.recv()).await {
        paths.push(path);
    }
    paths
}

#[tokio::test]
async fn test_poll_watcher_queues_new_json_only() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("alert_20250620_100000.json"), "{}").unwrap();

    let (queue, mut rx) = alert_queue();
    let _watcher = AlertWatcher::start(
        dir.path(),
        WatchMode::Poll,
        Duration::from_millis(50),
        queue,
    )
    .unwrap();

    // let the first scan record the existing file
    sleep(Duration::from_millis(300)).await;
    fs::write(dir.path().join("alert_20250620_152926.json"), "{}").unwrap();
    fs::write(dir.path().join("notes.txt"), "not an alert").unwrap();

    let first = timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("new alert should be queued")
        .unwrap();
    let mut queued = vec![first];
    queued.extend(drain(&mut rx, Duration::from_millis(500)).await);

    assert_eq!(names(&queued), vec!["alert_20250620_152926.json"]);
}
