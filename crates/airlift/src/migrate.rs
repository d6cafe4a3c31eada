use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use airlift_core::{
    DagMigrator, MigrateOptions, MigrationReport, MigrationResult, MigrationStatus, ReportStatus,
    RuleTable,
};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use indicatif::ProgressBar;
use log::debug;
use similar::TextDiff;

/// Arguments for the `migrate` command
#[derive(Args, Debug, Default, Clone)]
#[command(about = "Migrate Airflow 1.x DAG files to 2.x")]
pub struct MigrateArgs {
    /// Directory containing Airflow 1.x DAG files
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub source: PathBuf,

    /// Directory to write migrated files into. May equal --source for an
    /// in-place migration.
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub target: PathBuf,

    /// Convert eligible PythonOperator tasks to TaskFlow style
    #[arg(long)]
    pub taskflow: bool,

    /// Glob of source-relative paths to exclude from migration
    #[arg(long, value_name = "GLOB")]
    pub exclude: Option<String>,

    /// Print a unified diff for each changed file
    #[arg(long)]
    pub diff: bool,

    /// Write the JSON migration report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Per-file processing budget in seconds
    #[arg(long, value_name = "SECS", hide = true)]
    pub timeout: Option<u64>,
}

/// Execute the `migrate` command
pub fn execute(args: MigrateArgs) -> Result<()> {
    let options = MigrateOptions {
        taskflow: args.taskflow,
        exclude: args.exclude.clone(),
        timeout: args.timeout.map(Duration::from_secs),
        capture_output: args.diff,
    };
    let migrator = DagMigrator::new(RuleTable::airflow(), options)?;

    let files = migrator.enumerate_dag_files(&args.source)?;
    debug!("found {} DAG files", files.len());
    if files.is_empty() {
        anyhow::bail!("No .py DAG files found in {}", args.source.display());
    }

    let mut results = Vec::with_capacity(files.len());
    for path in &files {
        let rel = path.strip_prefix(&args.source).unwrap_or(path);
        let file_name = rel.display().to_string();

        // Only needed for --diff: the pre-migration text is gone after an
        // in-place run.
        let original = if args.diff {
            fs::read_to_string(path).ok()
        } else {
            None
        };

        let spinner = ProgressBar::new_spinner();
        spinner.set_message(format!("{file_name}: Migrating"));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = migrator.migrate_dag_file(path, &args.target.join(rel));
        spinner.finish_and_clear();

        print_result(&file_name, &result);
        if args.diff {
            print_diff(&file_name, original.as_deref(), &result);
        }
        results.push(result);
    }

    let report = MigrationReport::from_results(results);
    println!(
        "migrated={} skipped={} failed={}",
        report.success_count, report.partial_count, report.failed_count
    );

    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        eprintln!("Report written to {}", path.display());
    }

    if report.status != ReportStatus::Success {
        anyhow::bail!("Migration finished with unresolved files; see issues above");
    }
    Ok(())
}

fn print_result(file_name: &str, result: &MigrationResult) {
    match result.status {
        MigrationStatus::Success => {
            println!("{} {}", "✓".green(), file_name.green().bold());
        }
        MigrationStatus::Partial => {
            println!("{} {}", "⚠".yellow(), file_name.yellow().bold());
        }
        MigrationStatus::Failed => {
            println!("{} {}", "✗".red(), file_name.red().bold());
        }
    }
    for issue in &result.issues {
        println!("    {issue}");
    }
}

fn print_diff(file_name: &str, original: Option<&str>, result: &MigrationResult) {
    let (Some(before), Some(after)) = (original, result.target.as_deref()) else {
        return;
    };
    if before == after {
        return;
    }
    let diff = TextDiff::from_lines(before, after);
    print!(
        "{}",
        diff.unified_diff()
            .context_radius(3)
            .header(&format!("old/{file_name}"), &format!("new/{file_name}"))
    );
}
