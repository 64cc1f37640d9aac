mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "proxyup",
    about = "Regenerate a sing-box config on a schedule and publish it to git",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .proxyup/ or .git/)
    #[arg(long, global = true, env = "PROXYUP_ROOT")]
    root: Option<PathBuf>,

    /// Config file (default: <root>/.proxyup/config.yaml)
    #[arg(long, global = true, env = "PROXYUP_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .proxyup/config.yaml
    Init,

    /// Run the pipeline once (manual trigger)
    Run,

    /// Run the pipeline on a cron schedule
    Schedule {
        /// Cron expression overriding schedule.cron (seconds first)
        #[arg(long)]
        cron: Option<String>,

        /// Stop after this many runs
        #[arg(long)]
        max_runs: Option<usize>,

        /// Print the next N firing times and exit
        #[arg(long, value_name = "N")]
        preview: Option<usize>,
    },

    /// Run only the generator, without touching git
    Generate {
        /// Write to this path instead of the configured artifact
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run | Commands::Schedule { .. } | Commands::Generate { .. } => {
            tracing::Level::INFO
        }
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root, cli.json),
        Commands::Run => cmd::run::run(&root, config, cli.json),
        Commands::Schedule {
            cron,
            max_runs,
            preview,
        } => cmd::schedule::run(
            &root,
            config,
            cmd::schedule::ScheduleArgs {
                cron,
                max_runs,
                preview,
            },
            cli.json,
        ),
        Commands::Generate { output } => {
            cmd::generate::run(&root, config, output.as_deref(), cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(&root, config, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
