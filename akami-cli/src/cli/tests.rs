//! Unit tests for CLI argument parsing and command execution.

use akami_core::{HnswConfig, HnswError, HnswErrorCode, NodeId, ScoreKind, StorageError, StorageErrorCode};
use camino::Utf8PathBuf;
use clap::Parser;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;

struct Workspace {
    _dir: TempDir,
    store: Utf8PathBuf,
}

#[fixture]
fn workspace() -> Workspace {
    let dir = match TempDir::new() {
        Ok(dir) => dir,
        Err(err) => panic!("failed to create temp dir: {err}"),
    };
    let store = Utf8PathBuf::from_path_buf(dir.path().join("store"))
        .unwrap_or_else(|path| panic!("temp dir `{}` is not UTF-8", path.display()));
    Workspace { _dir: dir, store }
}

impl Workspace {
    fn run(&self, command: Command) -> Result<CommandOutput, CliError> {
        run_cli(Cli {
            store: self.store.clone(),
            metric: ScoreKind::SquaredEuclidean,
            command,
        })
    }

    fn parse_and_run(&self, args: &[&str]) -> Result<CommandOutput, CliError> {
        let mut argv = vec!["akami", "--store", self.store.as_str(), "--metric", "squared-euclidean"];
        argv.extend_from_slice(args);
        run_cli(Cli::try_parse_from(argv).expect("arguments must parse"))
    }
}

fn render(output: &CommandOutput) -> String {
    let mut buffer = Vec::new();
    render_output(output, &mut buffer).expect("render must succeed");
    String::from_utf8(buffer).expect("output must be UTF-8")
}

#[rstest]
fn added_items_are_queryable_across_invocations(workspace: Workspace) {
    let added = workspace
        .parse_and_run(&[
            "add",
            "--vector",
            "0,0",
            "--data",
            r#"{"name":"origin"}"#,
            "--vector",
            "-3,4",
            "--data",
            r#"{"name":"far"}"#,
        ])
        .expect("add must succeed");
    let CommandOutput::Added(added) = added else {
        panic!("unexpected output: {added:?}");
    };
    assert_eq!(added.items.len(), 2);
    assert_eq!(added.items[1].id, NodeId::new(2));

    let found = workspace
        .parse_and_run(&["query", "--vector", "-2.5,4", "--k", "1"])
        .expect("query must succeed");
    let CommandOutput::Query(found) = found else {
        panic!("unexpected output: {found:?}");
    };
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].id, NodeId::new(2));
    let name = found.items[0]
        .item
        .data
        .as_ref()
        .and_then(|data| data.get("name"))
        .and_then(|name| name.as_str());
    assert_eq!(name, Some("far"));
}

#[rstest]
fn mismatched_data_counts_are_rejected(workspace: Workspace) {
    let err = workspace
        .run(Command::Add(AddArgs {
            vectors: vec![VectorArg(vec![0.0]), VectorArg(vec![1.0])],
            data: vec![DataArg(serde_json::Map::new())],
        }))
        .expect_err("add must fail");
    assert!(matches!(
        err,
        CliError::DataCountMismatch {
            vectors: 2,
            data: 1
        }
    ));
}

#[rstest]
fn config_shows_defaults_then_freezes_after_update(workspace: Workspace) {
    let shown = workspace
        .run(Command::Config(ConfigArgs::default()))
        .expect("config must succeed");
    assert_eq!(shown, CommandOutput::Config(HnswConfig::default()));

    let updated = workspace
        .parse_and_run(&["config", "--m", "8", "--ef-search", "40"])
        .expect("update must succeed");
    let CommandOutput::Config(config) = updated else {
        panic!("unexpected output: {updated:?}");
    };
    assert_eq!((config.m, config.ef_search), (8, 40));

    let err = workspace
        .parse_and_run(&["config", "--m", "12"])
        .expect_err("changing M must fail");
    assert!(matches!(
        err,
        CliError::Core(HnswError::ImmutableConfigViolation { field: "M", .. })
    ));
}

#[rstest]
fn stats_clear_and_reset_round_trip(workspace: Workspace) {
    workspace
        .parse_and_run(&["add", "--vector", "1,1", "--vector", "2,2"])
        .expect("add must succeed");
    let stats = workspace
        .run(Command::Stats)
        .expect("stats must succeed");
    assert_eq!(render(&stats), "{\"total\":2,\"recall\":1.0}\n");

    let cleared = workspace.run(Command::Clear).expect("clear must succeed");
    assert_eq!(render(&cleared), "{}\n");
    let CommandOutput::Added(added) = workspace
        .parse_and_run(&["add", "--vector", "3,3"])
        .expect("add must succeed")
    else {
        panic!("add must report added items");
    };
    assert_eq!(added.items[0].id, NodeId::new(3));

    workspace.run(Command::Reset).expect("reset must succeed");
    let CommandOutput::Added(added) = workspace
        .parse_and_run(&["add", "--vector", "3,3"])
        .expect("add must succeed")
    else {
        panic!("add must report added items");
    };
    assert_eq!(added.items[0].id, NodeId::new(1));
}

#[rstest]
fn queries_before_any_insert_fail_with_a_stable_code(workspace: Workspace) {
    let err = workspace
        .parse_and_run(&["query", "--vector", "1,2"])
        .expect_err("query must fail");
    let CliError::Core(core) = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(core.code().as_str(), "HNSW_DIMENSIONS_UNSET");
}

#[rstest]
fn errors_expose_codes_and_blame(workspace: Workspace) {
    let unset = workspace
        .parse_and_run(&["query", "--vector", "1,2"])
        .expect_err("query must fail");
    assert_eq!(unset.code(), Some(HnswErrorCode::DimensionsUnset));
    assert_eq!(unset.storage_code(), None);
    assert!(unset.is_input_error());

    let mismatch = CliError::DataCountMismatch { vectors: 2, data: 1 };
    assert_eq!(mismatch.code(), None);
    assert!(mismatch.is_input_error());

    let storage = CliError::Core(HnswError::Storage(StorageError::backend("disk full")));
    assert_eq!(storage.code(), Some(HnswErrorCode::StorageFailure));
    assert_eq!(storage.storage_code(), Some(StorageErrorCode::Backend));
    assert!(!storage.is_input_error());
}

#[rstest]
#[case::unknown_metric(&["akami", "--store", "s", "--metric", "hamming", "stats"])]
#[case::missing_store(&["akami", "stats"])]
#[case::bad_component(&["akami", "--store", "s", "add", "--vector", "1,x"])]
#[case::missing_vector(&["akami", "--store", "s", "add"])]
#[case::non_object_data(&["akami", "--store", "s", "add", "--vector", "1", "--data", "[1]"])]
fn clap_rejects_malformed_arguments(#[case] argv: &[&str]) {
    assert!(Cli::try_parse_from(argv).is_err());
}

#[rstest]
fn metric_defaults_to_cosine() {
    let cli = Cli::try_parse_from(["akami", "--store", "s", "stats"]).expect("must parse");
    assert_eq!(cli.metric, ScoreKind::Cosine);
}

#[rstest]
#[case("1,2,3", vec![1.0, 2.0, 3.0])]
#[case(" -1 , 0.5 ", vec![-1.0, 0.5])]
fn vectors_parse_from_csv(#[case] raw: &str, #[case] expected: Vec<f32>) {
    assert_eq!(raw.parse::<VectorArg>(), Ok(VectorArg(expected)));
}

#[rstest]
fn vector_errors_name_the_component() {
    assert_eq!(
        "1,,3".parse::<VectorArg>(),
        Err(ArgError::InvalidComponent {
            position: 1,
            raw: String::new(),
        })
    );
}
