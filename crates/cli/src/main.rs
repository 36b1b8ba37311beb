use anyhow::Context;
use clap::{Parser, ValueEnum};
use modhound_core::manifest;
use modhound_core::opengraph::{self, ExportOptions, IdScheme, OpenGraph};
use modhound_core::process::{process, RootIdentity};
use modhound_core::report::ModGraphCommand;
use modhound_core::Graph;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// modhound - Go module graphs for BloodHound OpenGraph
#[derive(Parser, Debug)]
#[command(name = "modhound")]
#[command(version)] // Auto-pull version from Cargo.toml
#[command(about = "Convert `go mod graph` output into an OpenGraph document", long_about = None)]
struct Cli {
    /// Output file, or `-` for stdout
    #[arg(short, long, default_value = "opengraph.json")]
    output: PathBuf,

    /// Project directory containing go.mod
    #[arg(short = 'C', long, default_value = ".")]
    dir: PathBuf,

    /// Manifest to read the root module from [default: <DIR>/go.mod]
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Root module identity; skips reading the manifest
    #[arg(long)]
    root: Option<String>,

    /// Read a saved report (`-` for stdin) instead of running `go mod graph`
    #[arg(long)]
    input: Option<PathBuf>,

    /// Go executable used to produce the report
    #[arg(long, default_value = "go")]
    go: String,

    /// How node ids are built
    #[arg(long, value_enum, default_value_t = IdSchemeArg::Scoped)]
    id_scheme: IdSchemeArg,

    /// Prefix for scoped node ids
    #[arg(long, default_value = "modhound")]
    id_prefix: String,

    /// Source kind recorded in the document metadata
    #[arg(long, default_value = "ModHoundBase")]
    source_kind: String,

    /// Overwrite the output file if it exists
    #[arg(long)]
    force: bool,

    /// Pretty-print the JSON document
    #[arg(long)]
    pretty: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum IdSchemeArg {
    /// `<prefix>_<root>_<module>`
    Scoped,
    /// The bare module path
    Module,
}

impl Cli {
    fn export_options(&self) -> ExportOptions {
        let id_scheme = match self.id_scheme {
            IdSchemeArg::Scoped => IdScheme::Scoped {
                prefix: self.id_prefix.clone(),
            },
            IdSchemeArg::Module => IdScheme::Module,
        };

        ExportOptions {
            source_kind: self.source_kind.clone(),
            id_scheme,
            ..ExportOptions::default()
        }
    }

    fn manifest_path(&self) -> PathBuf {
        self.manifest
            .clone()
            .unwrap_or_else(|| self.dir.join("go.mod"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = format!("{err:#}");
            error!(error = %message, "conversion failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("MODHOUND_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "modhound=debug,info"
        } else {
            "modhound=info,warn"
        })
    });

    let format = env::var("MODHOUND_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // stderr keeps `--output -` clean
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let root = resolve_root(cli)?;
    info!(root = root.as_str(), "resolved root module");

    let graph = build_graph(cli, &root)?;
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built dependency graph"
    );

    let document = opengraph::export(&graph, &root, &cli.export_options());
    write_document(&document, &cli.output, cli.force, cli.pretty)?;
    info!(output = %cli.output.display(), "wrote opengraph document");

    Ok(())
}

fn resolve_root(cli: &Cli) -> anyhow::Result<RootIdentity> {
    let module = match &cli.root {
        Some(root) => root.clone(),
        None => {
            let path = cli.manifest_path();
            manifest::read_module_path(&path)
                .with_context(|| format!("failed to get root module from {}", path.display()))?
        }
    };

    RootIdentity::new(module).context("invalid root module")
}

fn build_graph(cli: &Cli, root: &RootIdentity) -> anyhow::Result<Graph> {
    match &cli.input {
        Some(path) if path == Path::new("-") => {
            let stdin = io::stdin();
            process(stdin.lock(), root).context("failed to process dependency report from stdin")
        }
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open dependency report {}", path.display()))?;
            process(BufReader::new(file), root)
                .with_context(|| format!("failed to process dependency report {}", path.display()))
        }
        None => {
            let mut report = ModGraphCommand::new(&cli.dir)
                .with_program(&cli.go)
                .spawn()?;

            match process(report.stdout(), root) {
                Ok(graph) => {
                    report.finish()?;
                    Ok(graph)
                }
                Err(err) => {
                    report.abort();
                    Err(err).context("failed to process go mod graph output")
                }
            }
        }
    }
}

/// Write the document, refusing to clobber an existing file unless forced
///
/// A file left half-written by a failed encode is removed.
fn write_document(
    document: &OpenGraph,
    output: &Path,
    force: bool,
    pretty: bool,
) -> anyhow::Result<()> {
    if output == Path::new("-") {
        let stdout = io::stdout();
        return encode(document, stdout.lock(), pretty).context("failed to write document to stdout");
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    let file = options
        .open(output)
        .with_context(|| format!("failed to create output file {}", output.display()))?;

    if let Err(err) = encode(document, BufWriter::new(file), pretty) {
        if let Err(remove_err) = fs::remove_file(output) {
            warn!(output = %output.display(), error = %remove_err, "could not remove partial output");
        }
        return Err(err).with_context(|| format!("failed to write output file {}", output.display()));
    }

    Ok(())
}

fn encode<W: Write>(document: &OpenGraph, mut writer: W, pretty: bool) -> anyhow::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, document)?;
    } else {
        serde_json::to_writer(&mut writer, document)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
