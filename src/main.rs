use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use xlsx_merger::consolidate::{self, MergeOutcome};
use xlsx_merger::options::{HeaderPolicy, MergeOptions, SchemaMismatchPolicy, parse_key_list};
use xlsx_merger::{Result, ToolError};

const DEFAULT_LOG_FILTER: &str = "xlsx_merger=info";

fn main() {
    let cli = Cli::parse();
    if let Err(error) = init_logging().and_then(|()| run(cli)) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| ToolError::Logging(err.to_string()))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Columns(args) => execute_columns(args),
        Command::Merge(args) => execute_merge(args),
    }
}

fn execute_columns(args: ColumnsArgs) -> Result<()> {
    let columns = consolidate::list_reference_columns(&args.reference, args.header_policy.into())?;
    for column in columns {
        println!("{column}");
    }
    Ok(())
}

fn execute_merge(args: MergeArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(ToolError::MissingInput(args.input));
    }

    let mut options = args.load_options()?;
    let output_dir = args.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let output = consolidate::resolve_output_path(&output_dir, args.name.as_deref());
    options.exclude.push(output.clone());

    let keys: Vec<String> = args.keys.iter().flat_map(|raw| parse_key_list(raw)).collect();
    let outcome = consolidate::merge_folder(&args.input, &keys, &options)?;
    report(&outcome);

    consolidate::write_table(&outcome.table, &output)?;
    println!("{}", output.display());
    Ok(())
}

fn report(outcome: &MergeOutcome) {
    for skipped in &outcome.skipped {
        eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
    }
    for rename in &outcome.renames {
        eprintln!(
            "renamed column '{}' from {} to '{}'",
            rename.original, rename.source, rename.renamed
        );
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Merge every spreadsheet under a folder into one table keyed on shared columns."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the columns of a reference spreadsheet, one per line.
    Columns(ColumnsArgs),
    /// Outer-join all spreadsheets found under a folder.
    Merge(MergeArgs),
}

#[derive(clap::Args)]
struct ColumnsArgs {
    /// Reference spreadsheet.
    reference: PathBuf,

    /// How header whitespace is normalised.
    #[arg(long, value_enum, default_value_t = HeaderPolicyKind::StripAll)]
    header_policy: HeaderPolicyKind,
}

#[derive(clap::Args)]
struct MergeArgs {
    /// Folder scanned recursively for spreadsheets.
    #[arg(long)]
    input: PathBuf,

    /// Key column(s) to join on. Repeat the flag or pass a comma-separated list.
    #[arg(long = "key", required = true)]
    keys: Vec<String>,

    /// Folder receiving the merged workbook. Defaults to the current directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Output file name; `.xlsx` is appended when missing.
    #[arg(long)]
    name: Option<String>,

    /// Optional JSON file with merge options.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Spreadsheet extension to include (repeatable). Overrides the configured set.
    #[arg(long = "extension")]
    extensions: Vec<String>,

    /// How header whitespace is normalised.
    #[arg(long, value_enum)]
    header_policy: Option<HeaderPolicyKind>,

    /// What to do with a spreadsheet that lacks a key column.
    #[arg(long, value_enum)]
    on_schema_mismatch: Option<SchemaMismatchKind>,
}

impl MergeArgs {
    fn load_options(&self) -> Result<MergeOptions> {
        let mut options = match &self.config {
            Some(path) => MergeOptions::from_json_file(path)?,
            None => MergeOptions::default(),
        };
        if !self.extensions.is_empty() {
            options.extensions = self
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect();
        }
        if let Some(policy) = self.header_policy {
            options.header_policy = policy.into();
        }
        if let Some(policy) = self.on_schema_mismatch {
            options.on_schema_mismatch = policy.into();
        }
        Ok(options)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum HeaderPolicyKind {
    StripAll,
    Trim,
}

impl From<HeaderPolicyKind> for HeaderPolicy {
    fn from(kind: HeaderPolicyKind) -> Self {
        match kind {
            HeaderPolicyKind::StripAll => HeaderPolicy::StripAll,
            HeaderPolicyKind::Trim => HeaderPolicy::Trim,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaMismatchKind {
    Abort,
    Skip,
}

impl From<SchemaMismatchKind> for SchemaMismatchPolicy {
    fn from(kind: SchemaMismatchKind) -> Self {
        match kind {
            SchemaMismatchKind::Abort => SchemaMismatchPolicy::Abort,
            SchemaMismatchKind::Skip => SchemaMismatchPolicy::Skip,
        }
    }
}
