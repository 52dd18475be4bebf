mod support;

use std::fs;
use std::path::Path;

use protox_batch::{App, AppError, BatchRange, Compound, Config, ResultTable};
use support::{cytotoxicity_table, recorder, FakeLauncher, Script};
use tempfile::TempDir;

fn row(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

fn app_in(dir: &Path) -> App {
    let config = Config {
        base_dir: dir.to_path_buf(),
        max_wait_secs: 1,
        poll_interval_secs: 0,
        element_timeout_secs: 0,
        pacing_delay_secs: 0,
        submit_settle_secs: 0,
        select_settle_secs: 0,
        ..Config::default()
    }
    .resolved();
    App::initialize(config).unwrap()
}

fn write_input(app: &App, compounds: &[(&str, &str)]) {
    let mut content = String::from("PubChem_ID,Original_SMILES,Canonical_SMILES\n");
    for (id, smiles) in compounds {
        content.push_str(&format!("{},{},{}\n", id, smiles, smiles));
    }
    fs::write(&app.config().canonical_smiles_file, content).unwrap();
}

fn write_cytotoxicity_artifact(app: &App, id: &str, prediction: &str, probability: &str) {
    let table = ResultTable::new(vec![
        row(&["Classification", "Target", "Shorthand", "Prediction", "Probability"]),
        row(&["Toxicity end points", "Cytotoxicity", "cyto", prediction, probability]),
    ]);
    app.store().write(id, &table).unwrap();
}

fn seed_failed_run(dir: &TempDir) -> App {
    let app = app_in(dir.path());
    write_input(&app, &[("1001", "CCO"), ("1002", "CC(=O)O")]);
    write_cytotoxicity_artifact(&app, "1001", "Inactive", "0.62");
    fs::write(
        &app.config().processing_log_file,
        "[2025-01-01 10:00:00] ✓ Compound 1001 processed successfully\n\
         [2025-01-01 10:16:00] ✗ Compound 1002 processing failed\n",
    )
    .unwrap();
    app
}

#[tokio::test]
async fn failed_compound_is_listed_and_summary_has_the_success() {
    let dir = tempfile::tempdir().unwrap();
    let app = seed_failed_run(&dir);
    let (launcher, rec) = FakeLauncher::new(Script::default());

    let result = app.retry(launcher, false).await.unwrap();

    assert_eq!(result.report.worklist, vec![Compound::new("1002", "CC(=O)O")]);
    assert_eq!(result.report.total_inputs, 2);
    assert!(result.retry_totals.is_none());
    assert_eq!(recorder(&rec).launches, 0);

    let failed_list = fs::read_to_string(&app.config().failed_list_file).unwrap();
    assert_eq!(
        failed_list.lines().collect::<Vec<_>>(),
        vec!["PubChem_ID,Canonical_SMILES", "1002,CC(=O)O"]
    );

    let summary = app.extract().unwrap();
    assert_eq!(summary.rows.len(), 1);
    assert_eq!(summary.rows[0].pubchem_id, "1001");
    assert_eq!(summary.rows[0].prediction, "Inactive");
    assert_eq!(summary.rows[0].probability, "0.62");
    assert_eq!(summary.inactive_count(), 1);

    let written = fs::read_to_string(&app.config().summary_file).unwrap();
    assert!(written.starts_with("PubChem_ID,Classification,Target,Shorthand,Prediction,Probability"));
    assert!(written.contains("1001,Toxicity end points,Cytotoxicity,cyto,Inactive,0.62"));
}

#[tokio::test]
async fn auto_retry_processes_worklist_and_removes_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let app = seed_failed_run(&dir);
    let script = Script {
        table: cytotoxicity_table("Active", "0.71"),
        ..Script::default()
    };
    let (launcher, rec) = FakeLauncher::new(script);

    let result = app.retry(launcher, true).await.unwrap();

    let totals = result.retry_totals.unwrap();
    assert_eq!(totals.success_count, 1);
    assert_eq!(totals.failure_count, 0);
    assert!(!app.config().temp_retry_file.exists());
    assert!(app.store().exists("1002"));
    assert_eq!(recorder(&rec).typed, vec!["CC(=O)O".to_string()]);
    assert_eq!(recorder(&rec).closes, 1);

    let (launcher, rec) = FakeLauncher::new(Script::default());
    let again = app.retry(launcher, true).await.unwrap();
    assert!(again.report.is_clean());
    assert!(again.retry_totals.is_none());
    assert_eq!(recorder(&rec).launches, 0);

    let summary = app.extract().unwrap();
    assert_eq!(summary.rows.len(), 2);
    assert_eq!(summary.active_count(), 1);
}

#[tokio::test]
async fn temp_file_is_removed_when_retry_cannot_start_browser() {
    let dir = tempfile::tempdir().unwrap();
    let app = seed_failed_run(&dir);
    let (launcher, _) = FakeLauncher::failing();

    let err = app.retry(launcher, true).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::SessionUnavailable(_))
    ));
    assert!(!app.config().temp_retry_file.exists());
}

#[tokio::test]
async fn artifact_without_target_assay_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_in(dir.path());
    let table = ResultTable::new(vec![
        row(&["Classification", "Target", "Shorthand", "Prediction", "Probability"]),
        row(&["Organ toxicity", "Hepatotoxicity", "dili", "Active", "0.55"]),
    ]);
    app.store().write("2001", &table).unwrap();

    write_input(&app, &[("2001", "c1ccccc1")]);
    fs::write(
        &app.config().processing_log_file,
        "[2025-01-01 12:00:00] ✓ Compound 2001 processed successfully\n",
    )
    .unwrap();

    let summary = app.extract().unwrap();

    assert_eq!(summary.artifacts_scanned, 1);
    assert!(summary.rows.is_empty());
    assert!(!app.config().summary_file.exists());

    let (launcher, _) = FakeLauncher::new(Script::default());
    let result = app.retry(launcher, false).await.unwrap();
    assert!(result.report.is_clean());
    assert!(!app.config().failed_list_file.exists());
}

#[tokio::test]
async fn clean_reconciliation_removes_stale_failed_list() {
    let dir = tempfile::tempdir().unwrap();
    let app = seed_failed_run(&dir);
    let (launcher, _) = FakeLauncher::new(Script::default());
    app.retry(launcher, false).await.unwrap();
    assert!(app.config().failed_list_file.exists());

    write_cytotoxicity_artifact(&app, "1002", "Active", "0.80");
    app.run_log()
        .append("✓ Compound 1002 processed successfully")
        .unwrap();

    let (launcher, _) = FakeLauncher::new(Script::default());
    let result = app.retry(launcher, false).await.unwrap();

    assert!(result.report.is_clean());
    assert!(!app.config().failed_list_file.exists());
}

#[tokio::test]
async fn truncated_artifact_is_put_back_on_the_worklist() {
    let dir = tempfile::tempdir().unwrap();
    let app = seed_failed_run(&dir);
    fs::write(app.store().path_for("1001"), "").unwrap();

    let (launcher, _) = FakeLauncher::new(Script::default());
    let result = app.retry(launcher, false).await.unwrap();

    let ids: Vec<_> = result
        .report
        .worklist
        .iter()
        .map(|c| c.pubchem_id.as_str())
        .collect();
    assert_eq!(ids, vec!["1001", "1002"]);
}

#[tokio::test]
async fn run_batch_without_input_fails_before_launch() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_in(dir.path());
    let (launcher, rec) = FakeLauncher::new(Script::default());

    let err = app
        .run_batch(launcher, BatchRange::all(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<AppError>(),
        Some(AppError::InputMissing { .. })
    ));
    assert_eq!(recorder(&rec).launches, 0);
}

#[tokio::test]
async fn run_batch_then_reconcile_is_clean() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_in(dir.path());
    write_input(&app, &[("3", "C"), ("1", "CC"), ("2", "CCC")]);
    let (launcher, rec) = FakeLauncher::new(Script::default());

    let totals = app
        .run_batch(launcher, BatchRange::new(0, Some(10)), None)
        .await
        .unwrap();

    assert_eq!(totals.success_count, 3);
    assert_eq!(recorder(&rec).closes, 1);
    let log = fs::read_to_string(&app.config().processing_log_file).unwrap();
    assert!(log.contains("ProTox-3 Automation Started"));
    assert!(log.contains("[1/3] Processing compound 3"));

    let (launcher, _) = FakeLauncher::new(Script::default());
    assert!(app.retry(launcher, false).await.unwrap().report.is_clean());
}

#[tokio::test]
async fn run_batch_reads_explicit_worklist() {
    let dir = tempfile::tempdir().unwrap();
    let app = seed_failed_run(&dir);
    let (launcher, _) = FakeLauncher::new(Script::default());
    app.retry(launcher, false).await.unwrap();

    let (launcher, rec) = FakeLauncher::new(Script::default());
    let failed_list = app.config().failed_list_file.clone();
    let totals = app
        .run_batch(launcher, BatchRange::all(), Some(failed_list.as_path()))
        .await
        .unwrap();

    assert_eq!(totals.processed(), 1);
    assert_eq!(recorder(&rec).typed, vec!["CC(=O)O".to_string()]);
}
