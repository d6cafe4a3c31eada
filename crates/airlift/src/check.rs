use std::path::PathBuf;

use airlift_core::{validate_file, RuleTable};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::file_walker;

/// Arguments for the `check` command
#[derive(Args, Debug, Default, Clone)]
#[command(about = "Check DAG files for syntax errors and leftover 1.x imports")]
pub struct CheckArgs {
    /// One or more .py files or directories containing DAG files to check.
    /// When omitted, all .py files in the current directory tree are checked.
    #[arg(value_name = "PATHS", value_hint = clap::ValueHint::AnyPath)]
    pub paths: Vec<PathBuf>,
}

/// Execute the `check` command
pub fn execute(args: CheckArgs) -> Result<()> {
    let rules = RuleTable::airflow();
    let files = file_walker::collect_py_files(&args.paths)?;
    if files.is_empty() {
        let cwd = std::env::current_dir()?;
        anyhow::bail!(
            "No .py files found in {}",
            cwd.canonicalize().unwrap_or(cwd).display()
        );
    }

    let mut invalid = 0usize;
    let mut flagged = 0usize;
    for path in &files {
        let file_name = path.display().to_string();
        let outcome = validate_file(&rules, path);
        if !outcome.valid {
            invalid += 1;
            println!("{} {}", "✗".red(), file_name.red().bold());
        } else if !outcome.issues.is_empty() {
            flagged += 1;
            println!("{} {}", "⚠".yellow(), file_name.yellow().bold());
        } else {
            println!("{} {}", "✓".green(), file_name.green().bold());
        }
        for issue in &outcome.issues {
            println!("    {issue}");
        }
    }

    if invalid > 0 || flagged > 0 {
        anyhow::bail!(
            "{} of {} files need attention",
            invalid + flagged,
            files.len()
        );
    }
    Ok(())
}
