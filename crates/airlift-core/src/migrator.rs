//! Pipeline orchestration: one file or a whole directory tree.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use log::{debug, warn};

use crate::error::MigrateError;
use crate::imports::transform_imports;
use crate::issue::{Issue, IssueKind};
use crate::operators::transform_operators;
use crate::report::{MigrationReport, MigrationResult};
use crate::rules::RuleTable;
use crate::taskflow::convert_to_taskflow;

/// Pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Imports,
    Operators,
    Taskflow,
}

/// One DAG file moving through the pipeline. `current_text` parses as valid
/// Python after every stage; a stage that cannot rewrite something safely
/// records an issue and leaves the construct alone.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub original_text: String,
    pub current_text: String,
    pub issues: Vec<Issue>,
    pub stages_applied: Vec<Stage>,
}

#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    /// Convert eligible `PythonOperator` tasks to TaskFlow style.
    pub taskflow: bool,
    /// Glob of source-relative paths to skip during directory migration.
    pub exclude: Option<String>,
    /// Per-file processing budget.
    pub timeout: Option<Duration>,
    /// Keep each file's final text on its `MigrationResult`.
    pub capture_output: bool,
}

#[derive(Debug)]
pub struct DagMigrator {
    rules: Arc<RuleTable>,
    taskflow: bool,
    exclude: Option<GlobSet>,
    timeout: Option<Duration>,
    capture_output: bool,
}

impl DagMigrator {
    /// Build a migrator. The rule table is validated here, before any file
    /// is touched; a conflicting table aborts the whole run.
    pub fn new(rules: RuleTable, options: MigrateOptions) -> Result<Self, MigrateError> {
        rules.validate()?;
        let exclude = match &options.exclude {
            Some(pattern) => {
                let glob = Glob::new(pattern).map_err(|e| MigrateError::InvalidGlob {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
                let mut builder = GlobSetBuilder::new();
                builder.add(glob);
                Some(builder.build().map_err(|e| MigrateError::InvalidGlob {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?)
            }
            None => None,
        };
        Ok(Self {
            rules: Arc::new(rules),
            taskflow: options.taskflow,
            exclude,
            timeout: options.timeout,
            capture_output: options.capture_output,
        })
    }

    /// Run the transformer pipeline over in-memory source. The filesystem
    /// is untouched; `path` labels parse errors and issues.
    pub fn migrate_source(&self, path: &Path, source: &str) -> Result<SourceUnit, MigrateError> {
        run_pipeline(&self.rules, self.taskflow, path, source)
    }

    /// Migrate a single file. `target_path` may equal `source_path` for
    /// in-place migration. Failures of any kind end up on the returned
    /// result; this never panics or propagates.
    pub fn migrate_dag_file(&self, source_path: &Path, target_path: &Path) -> MigrationResult {
        debug!("migrating {}", source_path.display());
        let mut result = MigrationResult::new(source_path, target_path);

        let bytes = match fs::read(source_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                result.fail(Issue::error(
                    IssueKind::Io,
                    None,
                    format!("failed to read file: {e}"),
                ));
                return result;
            }
        };
        let source = match String::from_utf8(bytes) {
            Ok(source) => source,
            Err(_) => {
                result.fail(Issue::error(
                    IssueKind::DecodeError,
                    None,
                    "file is not valid UTF-8; skipped",
                ));
                return result;
            }
        };

        let unit = match self.run_with_timeout(source_path, source) {
            Ok(Ok(unit)) => unit,
            Ok(Err(MigrateError::Parse { line, message, .. })) => {
                result.fail(Issue::error(IssueKind::ParseError, Some(line), message));
                return result;
            }
            Ok(Err(err)) => {
                result.fail(Issue::error(IssueKind::Io, None, err.to_string()));
                return result;
            }
            Err(budget) => {
                result.fail(Issue::error(
                    IssueKind::Timeout,
                    None,
                    format!("processing exceeded the {}s budget", budget.as_secs_f64()),
                ));
                return result;
            }
        };

        result.issues.extend(unit.issues.iter().cloned());

        if let Some(parent) = target_path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = fs::create_dir_all(parent) {
                    result.fail(Issue::error(
                        IssueKind::Io,
                        None,
                        format!("failed to create target directory: {e}"),
                    ));
                    return result;
                }
            }
        }
        if let Err(e) = fs::write(target_path, &unit.current_text) {
            result.fail(Issue::error(
                IssueKind::Io,
                None,
                format!("failed to write file: {e}"),
            ));
            return result;
        }

        if self.capture_output {
            result.target = Some(unit.current_text);
        }
        result.finalize();
        result
    }

    /// Migrate every eligible `.py` file under `source_dir`, mirroring the
    /// relative tree under `target_dir`. Per-file failures never abort the
    /// rest of the run; files are processed in sorted path order so the
    /// report is deterministic.
    pub fn migrate_dag_files(
        &self,
        source_dir: &Path,
        target_dir: &Path,
    ) -> Result<MigrationReport, MigrateError> {
        let files = self.enumerate_dag_files(source_dir)?;
        let mut results = Vec::with_capacity(files.len());
        for path in &files {
            let rel = path.strip_prefix(source_dir).unwrap_or(path);
            let target = target_dir.join(rel);
            results.push(self.migrate_dag_file(path, &target));
        }
        Ok(MigrationReport::from_results(results))
    }

    /// All `*.py` files under `source_dir` except `__init__.py` and paths
    /// matching the exclusion glob, in sorted order.
    pub fn enumerate_dag_files(&self, source_dir: &Path) -> Result<Vec<PathBuf>, MigrateError> {
        if !source_dir.is_dir() {
            return Err(MigrateError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("source directory not found: {}", source_dir.display()),
            )));
        }

        let walker = WalkBuilder::new(source_dir)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() || path.extension() != Some(OsStr::new("py")) {
                continue;
            }
            if path.file_name() == Some(OsStr::new("__init__.py")) {
                continue;
            }
            if let Some(exclude) = &self.exclude {
                let rel = path.strip_prefix(source_dir).unwrap_or(path);
                if exclude.is_match(rel) {
                    debug!("excluded {}", path.display());
                    continue;
                }
            }
            files.push(path.to_path_buf());
        }
        files.sort();
        Ok(files)
    }

    /// Run the pipeline, optionally bounded by the per-file budget. The
    /// bounded path hands the work to a throwaway thread so an expired file
    /// cannot stall the rest of the run.
    fn run_with_timeout(
        &self,
        path: &Path,
        source: String,
    ) -> Result<Result<SourceUnit, MigrateError>, Duration> {
        let Some(budget) = self.timeout else {
            return Ok(run_pipeline(&self.rules, self.taskflow, path, &source));
        };

        let rules = Arc::clone(&self.rules);
        let taskflow = self.taskflow;
        let path = path.to_path_buf();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let outcome = run_pipeline(&rules, taskflow, &path, &source);
            let _ = tx.send(outcome);
        });
        match rx.recv_timeout(budget) {
            Ok(outcome) => Ok(outcome),
            Err(RecvTimeoutError::Timeout) => Err(budget),
            Err(RecvTimeoutError::Disconnected) => Ok(Err(MigrateError::Io(
                std::io::Error::other("migration worker terminated unexpectedly"),
            ))),
        }
    }
}

fn run_pipeline(
    rules: &RuleTable,
    taskflow: bool,
    path: &Path,
    source: &str,
) -> Result<SourceUnit, MigrateError> {
    let mut unit = SourceUnit {
        path: path.to_path_buf(),
        original_text: source.to_owned(),
        current_text: source.to_owned(),
        issues: Vec::new(),
        stages_applied: Vec::new(),
    };

    let (text, issues) = transform_imports(rules, path, &unit.current_text)?;
    unit.current_text = text;
    unit.issues.extend(issues);
    unit.stages_applied.push(Stage::Imports);

    let (text, issues) = transform_operators(rules, path, &unit.current_text)?;
    unit.current_text = text;
    unit.issues.extend(issues);
    unit.stages_applied.push(Stage::Operators);

    if taskflow {
        let (text, issues) = convert_to_taskflow(path, &unit.current_text)?;
        unit.current_text = text;
        unit.issues.extend(issues);
        unit.stages_applied.push(Stage::Taskflow);
    }

    Ok(unit)
}
