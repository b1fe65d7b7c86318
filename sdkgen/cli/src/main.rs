use std::path::{Path, PathBuf};

use clap::{ArgGroup, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Generator, Shell};
use color_eyre::eyre::{Context, Result};
use owo_colors::OwoColorize;
use sdkgen_lib::model::{ConstValue, Operand, TypeBody};
use sdkgen_lib::{
    DistributionMode, GenerateRequest, GenerateSummary, GeneratorConfig, ResourceModel,
    SdkGenerator,
};
use tracing::debug;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "sdkgen",
    version,
    about = "Generate Go and PHP client SDKs from Go API contract files"
)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase verbosity (-v INFO, -vv DEBUG, -vvv TRACE, -vvvv TRACE with file/line)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Where the Go project lives and how it is configured
#[derive(clap::Args, Debug, Clone)]
struct ProjectArgs {
    /// Root of the Go project (the directory holding go.mod)
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Configuration file (defaults to <root>/sdkgen.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// Arguments for the generate command
#[derive(clap::Args, Debug, Clone)]
#[command(group = ArgGroup::new("selection").args(["files", "all"]).required(true))]
struct GenerateArgs {
    /// Type files to generate from
    #[arg(value_name = "TYPE_FILE")]
    files: Vec<PathBuf>,

    /// Generate from every eligible type file
    #[arg(long)]
    all: bool,

    #[command(flatten)]
    project: ProjectArgs,

    /// Where the generated SDK is published
    #[arg(long, value_enum, default_value_t = ModeArg::Local)]
    mode: ModeArg,

    /// Go output directory (defaults to the mode's SDK directory)
    #[arg(long, value_name = "DIR")]
    go_out: Option<PathBuf>,

    /// PHP output directory; PHP is only generated when given
    #[arg(long, value_name = "DIR")]
    php_out: Option<PathBuf>,

    /// Skip the Go SDK
    #[arg(long)]
    no_go: bool,

    /// Print the generated files instead of writing them
    #[arg(long)]
    dry_run: bool,
}

/// Arguments for the inspect command
#[derive(clap::Args, Debug, Clone)]
struct InspectArgs {
    /// Type file to extract
    #[arg(value_name = "TYPE_FILE")]
    file: PathBuf,

    #[command(flatten)]
    project: ProjectArgs,
}

/// Arguments for the completions command
#[derive(clap::Args, Debug, Clone)]
struct CompletionsArgs {
    /// The shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Generate SDK code from type files and their route files
    Generate(GenerateArgs),
    /// Print the interface model extracted from one type file
    Inspect(InspectArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ModeArg {
    Local,
    Publish,
    Legacy,
}

impl From<ModeArg> for DistributionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Local => DistributionMode::Local,
            ModeArg::Publish => DistributionMode::Publish,
            ModeArg::Legacy => DistributionMode::Legacy,
        }
    }
}

/// Initialize tracing subscriber based on verbosity level.
///
/// `RUST_LOG`, when set, replaces the level filter and enables logging even
/// without `-v`.
///
/// Verbosity levels:
/// - 0 (default): no subscriber
/// - 1 (-v): INFO (run summary, files written)
/// - 2 (-vv): DEBUG (per-file extraction and rendering)
/// - 3 (-vvv): TRACE
/// - 4+ (-vvvv): TRACE with file/line numbers
fn init_tracing(verbose: u8) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.trim().is_empty() => filter,
        _ => match verbose {
            0 => return,
            1 => "warn,sdkgen=info,sdkgen_lib=info".to_string(),
            2 => "info,sdkgen=debug,sdkgen_lib=debug".to_string(),
            _ => "debug,sdkgen=trace,sdkgen_lib=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_file(verbose >= 4)
                .with_line_number(verbose >= 4)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Completions(args) => {
            print_completions(args.shell, &mut Cli::command());
            Ok(())
        }
        Command::Generate(args) => generate(args, cli.json),
        Command::Inspect(args) => inspect(args, cli.json),
    }
}

fn load_config(project: &ProjectArgs) -> Result<GeneratorConfig> {
    let config = GeneratorConfig::load(&project.root, project.config.as_deref())
        .with_context(|| format!("loading configuration for `{}`", project.root.display()))?;
    debug!(root = %project.root.display(), "configuration loaded");
    Ok(config)
}

fn generate(args: &GenerateArgs, json: bool) -> Result<()> {
    let config = load_config(&args.project)?;
    let generator = SdkGenerator::new(&args.project.root, config, args.mode.into());

    let request = GenerateRequest {
        inputs: args.files.clone(),
        all: args.all,
        go_out: args.go_out.clone(),
        php_out: args.php_out.clone(),
        no_go: args.no_go,
        dry_run: args.dry_run,
    };
    let summary = generator
        .run(&request)
        .with_context(|| format!("generating SDK for `{}`", args.project.root.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, &args.project.root);
    }
    Ok(())
}

fn inspect(args: &InspectArgs, json: bool) -> Result<()> {
    let config = load_config(&args.project)?;
    let generator = SdkGenerator::new(&args.project.root, config, DistributionMode::Local);

    let model = generator
        .inspect(&args.file)
        .with_context(|| format!("inspecting `{}`", args.file.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        print_model(&model);
    }
    Ok(())
}

fn print_summary(summary: &GenerateSummary, root: &Path) {
    let verb = if summary.dry_run { "Would write" } else { "Wrote" };
    for file in &summary.files {
        let shown = file.strip_prefix(root).unwrap_or(file.as_path());
        println!("  {} {}", "+".green(), shown.display());
    }
    println!(
        "{} {} file(s) for {} resource(s) [{}]",
        verb.bold(),
        summary.files.len(),
        summary.resources.len(),
        summary.mode.to_string().cyan()
    );
}

fn print_model(model: &ResourceModel) {
    println!(
        "{} {} ({})",
        "resource".dimmed(),
        model.resource.bold(),
        model.source.display()
    );

    if !model.constants.is_empty() {
        println!("\n{}", "constants".bold().underline());
        for group in &model.constants {
            for (name, value) in group.expanded() {
                println!("  {} = {}", name.yellow(), const_text(&value));
            }
        }
    }

    if !model.general.is_empty() {
        println!("\n{}", "types".bold().underline());
        for decl in &model.general {
            match &decl.body {
                TypeBody::Scalar(underlying) => {
                    println!("  {} {}", decl.name.cyan(), underlying.dimmed());
                }
                TypeBody::Struct(fields) => {
                    println!("  {} {} field(s)", decl.name.cyan(), fields.len());
                }
            }
        }
    }

    if !model.pairs.is_empty() {
        println!("\n{}", "actions".bold().underline());
        for pair in &model.pairs {
            let route = pair
                .route
                .as_ref()
                .map(|route| format!("{} {}", route.method, route.path))
                .unwrap_or_else(|| "unrouted".to_string());
            println!(
                "  {} {} -> {} {}",
                pair.action.green(),
                pair.request.name,
                pair.response.name,
                route.dimmed()
            );
        }
    }
}

fn const_text(value: &ConstValue) -> String {
    let operand = |operand: &Operand| match operand {
        Operand::Ident(text) | Operand::Literal(text) => text.clone(),
    };

    match value {
        ConstValue::Ident { name } => name.clone(),
        ConstValue::Literal { text } => text.clone(),
        ConstValue::Binary { left, op, right } => {
            format!("{} {op} {}", operand(left), operand(right))
        }
    }
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    clap_complete::generate(generator, cmd, cmd.get_name().to_string(), &mut std::io::stdout());
}
