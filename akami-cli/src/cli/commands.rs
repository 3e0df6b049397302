//! Command implementations and argument parsing for the akami CLI.

use std::io::{self, Write};
use std::sync::Arc;

use akami_core::{
    ConfigUpdate, HnswConfig, HnswError, HnswErrorCode, IndexBuilder, ScoreKind,
    StorageErrorCode,
    collection::{
        AddItemsRequest, AddItemsResponse, Collection, Item, QueryRequest, QueryResponse,
        StatsResponse,
    },
};
use akami_providers_fs::{FsStorage, FsStorageError};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::args::{DataArg, VectorArg};

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(name = "akami", about = "Maintain and query an HNSW vector index.")]
pub struct Cli {
    /// Directory holding the collection; created when missing.
    #[arg(long)]
    pub store: Utf8PathBuf,

    /// Score function used to compare vectors.
    #[arg(long, default_value_t = ScoreKind::Cosine)]
    pub metric: ScoreKind,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Insert one or more vectors.
    Add(AddArgs),
    /// Find the vectors closest to a query.
    Query(QueryArgs),
    /// Show the configuration, or update it when any option is given.
    Config(ConfigArgs),
    /// Report the item count and self-query recall.
    Stats,
    /// Remove every item, keeping the configuration and id counter.
    Clear,
    /// Remove everything, including the configuration.
    Reset,
}

/// Options accepted by the `add` command.
#[derive(Debug, Args, Clone)]
pub struct AddArgs {
    /// Comma-separated vector components; repeat for several items.
    #[arg(long = "vector", required = true, allow_hyphen_values = true)]
    pub vectors: Vec<VectorArg>,

    /// JSON object stored with the item at the same position.
    #[arg(long = "data")]
    pub data: Vec<DataArg>,
}

/// Options accepted by the `query` command.
#[derive(Debug, Args, Clone)]
pub struct QueryArgs {
    /// Comma-separated query components.
    #[arg(long, allow_hyphen_values = true)]
    pub vector: VectorArg,

    /// Maximum number of results.
    #[arg(long)]
    pub k: Option<usize>,

    /// Drop results scoring above this value.
    #[arg(long, allow_hyphen_values = true)]
    pub threshold: Option<f32>,
}

/// Options accepted by the `config` command.
#[derive(Debug, Args, Clone, Default)]
pub struct ConfigArgs {
    /// Target degree for new nodes.
    #[arg(long)]
    pub m: Option<usize>,
    /// Degree bound above the ground layer.
    #[arg(long = "m-max")]
    pub m_max: Option<usize>,
    /// Degree bound at the ground layer.
    #[arg(long = "m-max0")]
    pub m_max0: Option<usize>,
    /// Candidate pool size while inserting.
    #[arg(long = "ef-construction")]
    pub ef_construction: Option<usize>,
    /// Candidate pool size while querying.
    #[arg(long = "ef-search")]
    pub ef_search: Option<usize>,
}

impl From<ConfigArgs> for ConfigUpdate {
    fn from(args: ConfigArgs) -> Self {
        Self {
            m: args.m,
            m_max: args.m_max,
            m_max0: args.m_max0,
            ef_construction: args.ef_construction,
            ef_search: args.ef_search,
        }
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The store directory could not be opened.
    #[error(transparent)]
    Store(#[from] FsStorageError),
    /// The async runtime could not be started.
    #[error("failed to start the async runtime: {source}")]
    Runtime {
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// `--data` was given a different number of times than `--vector`.
    #[error("got {data} --data values for {vectors} vectors")]
    DataCountMismatch {
        /// Number of vectors supplied.
        vectors: usize,
        /// Number of data objects supplied.
        data: usize,
    },
    /// The index rejected the request or could not be read or written.
    #[error(transparent)]
    Core(#[from] HnswError),
}

impl CliError {
    /// Stable engine code, when the index produced the error.
    #[must_use]
    pub const fn code(&self) -> Option<HnswErrorCode> {
        match self {
            Self::Core(error) => Some(error.code()),
            _ => None,
        }
    }

    /// Stable storage code, when the index failed to read or write.
    #[must_use]
    pub const fn storage_code(&self) -> Option<StorageErrorCode> {
        match self {
            Self::Core(error) => error.storage_code(),
            _ => None,
        }
    }

    /// Whether the invocation itself was at fault rather than the store or
    /// the runtime.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        match self {
            Self::DataCountMismatch { .. } => true,
            Self::Core(error) => error.is_input_error(),
            Self::Store(_) | Self::Runtime { .. } => false,
        }
    }
}

/// Response produced by one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    /// Items inserted by `add`.
    Added(AddItemsResponse),
    /// Matches found by `query`.
    Query(QueryResponse),
    /// Active configuration after `config`.
    Config(HnswConfig),
    /// Statistics reported by `stats`.
    Stats(StatsResponse),
    /// Acknowledgement for `clear` and `reset`.
    Done(Empty),
}

/// Serialises as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Empty {}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when the store cannot be opened or the command fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use akami_cli::cli::{AddArgs, Cli, Command, CommandOutput, run_cli};
/// # use akami_core::ScoreKind;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let dir = tempfile::tempdir()?;
/// let store = camino::Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
///     .map_err(|_| "non UTF-8 temp dir")?;
/// let cli = Cli {
///     store,
///     metric: ScoreKind::Cosine,
///     command: Command::Add(AddArgs {
///         vectors: vec!["1,0".parse()?, "0,1".parse()?],
///         data: Vec::new(),
///     }),
/// };
/// let CommandOutput::Added(added) = run_cli(cli)? else {
///     return Err("unexpected output".into());
/// };
/// assert_eq!(added.items.len(), 2);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(store = %cli.store, metric = %cli.metric, command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<CommandOutput, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|source| CliError::Runtime { source })?;
    let storage = Arc::new(FsStorage::open(&cli.store)?);
    runtime.block_on(async move {
        let collection =
            Collection::open(storage, IndexBuilder::new().with_score_kind(cli.metric)).await?;
        Span::current().record("command", field::display(command_name(&cli.command)));
        run_command(&collection, cli.command).await
    })
}

const fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Add(_) => "add",
        Command::Query(_) => "query",
        Command::Config(_) => "config",
        Command::Stats => "stats",
        Command::Clear => "clear",
        Command::Reset => "reset",
    }
}

pub(super) async fn run_command(
    collection: &Collection<FsStorage>,
    command: Command,
) -> Result<CommandOutput, CliError> {
    let output = match command {
        Command::Add(args) => CommandOutput::Added(run_add(collection, args).await?),
        Command::Query(args) => CommandOutput::Query(
            collection
                .query(QueryRequest {
                    vector: args.vector.0,
                    k: args.k,
                    threshold: args.threshold,
                })
                .await?,
        ),
        Command::Config(args) => CommandOutput::Config(run_config(collection, args).await?),
        Command::Stats => CommandOutput::Stats(collection.stats().await?),
        Command::Clear => {
            collection.clear().await?;
            CommandOutput::Done(Empty {})
        }
        Command::Reset => {
            collection.reset().await?;
            CommandOutput::Done(Empty {})
        }
    };
    Ok(output)
}

pub(super) async fn run_add(
    collection: &Collection<FsStorage>,
    args: AddArgs,
) -> Result<AddItemsResponse, CliError> {
    let AddArgs { vectors, data } = args;
    if !data.is_empty() && data.len() != vectors.len() {
        return Err(CliError::DataCountMismatch {
            vectors: vectors.len(),
            data: data.len(),
        });
    }
    let mut data = data.into_iter().map(|DataArg(object)| object);
    let items = vectors
        .into_iter()
        .map(|VectorArg(vector)| Item {
            vector,
            data: data.next(),
        })
        .collect();
    let added = collection.add_items(AddItemsRequest { items }).await?;
    info!(items = added.items.len(), "items added");
    Ok(added)
}

pub(super) async fn run_config(
    collection: &Collection<FsStorage>,
    args: ConfigArgs,
) -> Result<HnswConfig, CliError> {
    let update = ConfigUpdate::from(args);
    if update.is_empty() {
        return Ok(collection.config().await);
    }
    let config = collection.set_config(update).await?;
    info!(?config, "configuration updated");
    Ok(config)
}

/// Renders `output` to `writer` as one line of JSON.
///
/// # Errors
/// Returns [`io::Error`] if serialisation or writing fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use akami_cli::cli::{CommandOutput, render_output};
/// # use akami_core::collection::StatsResponse;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let output = CommandOutput::Stats(StatsResponse { total: 3, recall: 1.0 });
/// let mut buffer = Vec::new();
/// render_output(&output, &mut buffer)?;
/// assert_eq!(String::from_utf8(buffer)?, "{\"total\":3,\"recall\":1.0}\n");
/// # Ok(())
/// # }
/// ```
pub fn render_output(output: &CommandOutput, mut writer: impl Write) -> io::Result<()> {
    serde_json::to_writer(&mut writer, output)?;
    writeln!(writer)
}
