//! Interpose CLI
//!
//! Runs the proxy engine's demo scenarios and prints contract descriptors.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use interpose_cli::commands;
use interpose_cli::config::load_options;
use interpose_cli::output::{resolve_color_choice, StyledOutput};
use tracing::Level;

#[derive(Parser)]
#[command(name = "interpose")]
#[command(about = "Dynamic proxy and method interception demo", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine options file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Color output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call my_method through an intercepted proxy
    Demo {
        /// Pass an integer as the second argument
        #[arg(long)]
        int: bool,
        /// Make before_invoke reject the call
        #[arg(long)]
        fail_before: bool,
    },

    /// Print the demo contracts' descriptors
    Describe,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));
    let options = load_options(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Demo { int, fail_before } => {
            commands::demo::execute(options, int, fail_before, &mut out)
        }
        Commands::Describe => commands::describe::execute(&mut out),
    };

    if let Err(err) = result {
        out.stderr_error(&format!("error: {:#}", err));
        std::process::exit(1);
    }
    Ok(())
}
