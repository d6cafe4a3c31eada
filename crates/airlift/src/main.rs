use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;

mod check;
mod file_walker;
mod migrate;

#[derive(Parser)]
#[command(name = "airlift")]
#[command(about = "Migration tooling for Apache Airflow DAGs", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true, hide = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate Airflow 1.x DAG files to 2.x
    #[command(alias = "m")]
    Migrate(migrate::MigrateArgs),

    /// Check DAG files for syntax errors and leftover 1.x imports
    #[command(alias = "c")]
    Check(check::CheckArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Default level depends on --debug; RUST_LOG still wins.
    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Migrate(args) => migrate::execute(args),
        Commands::Check(args) => check::execute(args),
    }
}
