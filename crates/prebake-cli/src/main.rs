//! Prebake command-line tool
//!
//! Runs a program's initialization code ahead of time and writes a program
//! that rebuilds the resulting heap directly.

mod commands;
mod config;
mod output;

use clap::{Parser, Subcommand};
use commands::SerializerFlags;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "prebake")]
#[command(about = "Ahead-of-time heap serializer", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ./prebake.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Color output: auto, always or never
    #[arg(long, global = true)]
    color: Option<String>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the inputs and write the serialized heap
    Build {
        /// Source files, run in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Where to write the heap graph (default: next to the output)
        #[arg(long)]
        heap_graph_out: Option<PathBuf>,
        /// Print serializer statistics as JSON on stderr
        #[arg(long)]
        stats: bool,
        #[command(flatten)]
        flags: SerializerFlags,
    },

    /// Run the inputs and report diagnostics without writing anything
    Check {
        /// Source files, run in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        flags: SerializerFlags,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let choice = output::resolve_color_choice(cli.color.as_deref());
    let result = match cli.command {
        Commands::Build {
            files,
            out,
            heap_graph_out,
            stats,
            flags,
        } => commands::build::execute(commands::build::BuildArgs {
            files,
            out,
            heap_graph_out,
            stats,
            flags,
            config: cli.config,
            color: choice,
        }),
        Commands::Check { files, flags } => {
            commands::check::execute(files, flags, cli.config, choice)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            output::StyledOutput::new(choice).error_line(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
