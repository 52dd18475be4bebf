mod support;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use protox_batch::{
    AppError, BatchRange, BatchRunner, Compound, CompoundFlow, ResultStore, RunLog,
};
use support::{fast_settings, recorder, FakeLauncher, Script};
use tempfile::TempDir;

fn compounds() -> Vec<Compound> {
    vec![
        Compound::new("1", "C"),
        Compound::new("2", "CC"),
        Compound::new("3", "CCC"),
        Compound::new("4", "CCCC"),
    ]
}

fn runner(dir: &TempDir, launcher: FakeLauncher) -> (BatchRunner<FakeLauncher>, ResultStore) {
    let store = ResultStore::new(dir.path().join("results"));
    let log = Arc::new(RunLog::new(dir.path().join("processing_log.txt")));
    let flow = CompoundFlow::new(fast_settings(), store.clone(), log.clone());
    (
        BatchRunner::new(launcher, flow, log, Duration::ZERO),
        store,
    )
}

#[tokio::test]
async fn one_session_for_the_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, rec) = FakeLauncher::new(Script::default());
    let (runner, store) = runner(&dir, launcher);

    let totals = runner.run(&compounds(), BatchRange::all()).await.unwrap();

    assert_eq!(totals.success_count, 4);
    assert_eq!(totals.failure_count, 0);
    let rec = recorder(&rec);
    assert_eq!(rec.launches, 1);
    assert_eq!(rec.closes, 1);
    assert_eq!(rec.navigations, 4);
    assert_eq!(store.list().unwrap().len(), 4);
}

#[tokio::test]
async fn failures_do_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut script = Script::default();
    script.empty_for.insert("CC".to_string());
    let (launcher, rec) = FakeLauncher::new(script);
    let (runner, store) = runner(&dir, launcher);

    let totals = runner.run(&compounds(), BatchRange::all()).await.unwrap();

    assert_eq!(totals.success_count, 3);
    assert_eq!(totals.failure_count, 1);
    assert_eq!(totals.processed(), 4);
    assert!(!store.exists("2"));
    assert!(store.exists("4"));
    assert_eq!(recorder(&rec).closes, 1);
}

#[tokio::test]
async fn range_selects_half_open_slice_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, rec) = FakeLauncher::new(Script::default());
    let (runner, _) = runner(&dir, launcher);

    let totals = runner
        .run(&compounds(), BatchRange::new(1, Some(3)))
        .await
        .unwrap();

    assert_eq!(totals.processed(), 2);
    assert_eq!(recorder(&rec).typed, vec!["CC".to_string(), "CCC".to_string()]);
}

#[tokio::test]
async fn end_beyond_list_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, _) = FakeLauncher::new(Script::default());
    let (runner, _) = runner(&dir, launcher);

    let totals = runner
        .run(&compounds(), BatchRange::new(2, Some(100)))
        .await
        .unwrap();

    assert_eq!(totals.processed(), 2);
}

#[tokio::test]
async fn empty_range_never_launches_a_browser() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, rec) = FakeLauncher::new(Script::default());
    let (runner, _) = runner(&dir, launcher);

    let totals = runner
        .run(&compounds(), BatchRange::new(3, Some(1)))
        .await
        .unwrap();

    assert_eq!(totals.processed(), 0);
    assert_eq!(recorder(&rec).launches, 0);
}

#[tokio::test]
async fn launch_failure_is_session_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let (launcher, rec) = FakeLauncher::failing();
    let (runner, store) = runner(&dir, launcher);

    let err = runner
        .run(&compounds(), BatchRange::all())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::SessionUnavailable(_)));
    assert!(store.list().unwrap().is_empty());
    let rec = recorder(&rec);
    assert_eq!(rec.launches, 1);
    assert_eq!(rec.closes, 0);
}

#[tokio::test]
async fn panic_mid_batch_still_closes_session_once() {
    let dir = tempfile::tempdir().unwrap();
    let script = Script {
        panic_on: Some("CCC".to_string()),
        ..Script::default()
    };
    let (launcher, rec) = FakeLauncher::new(script);
    let (runner, store) = runner(&dir, launcher);
    let list = compounds();

    let result = AssertUnwindSafe(runner.run(&list, BatchRange::all()))
        .catch_unwind()
        .await;

    assert!(result.is_err());
    assert_eq!(recorder(&rec).closes, 1);
    assert!(store.exists("1"));
    assert!(store.exists("2"));
    assert!(!store.exists("4"));
}
