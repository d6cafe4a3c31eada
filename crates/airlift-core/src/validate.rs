//! Post-migration structural checks.
//!
//! The migration engine guarantees its output parses; this module is the
//! consumer of that guarantee. It re-parses a file and flags any import
//! that the rule table would still want to rewrite, so a tree can be
//! audited after (or instead of) a migration run.

use std::fs;
use std::path::Path;

use ruff_python_ast::visitor::{self, Visitor};
use ruff_python_ast::Stmt;
use ruff_text_size::Ranged;

use crate::edit::line_of;
use crate::error::MigrateError;
use crate::issue::{Issue, IssueKind};
use crate::python;
use crate::rules::RuleTable;

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// Whether the file parses as Python at all.
    pub valid: bool,
    pub issues: Vec<Issue>,
}

pub fn validate_source(rules: &RuleTable, path: &Path, source: &str) -> ValidationOutcome {
    let module = match python::parse(path, source) {
        Ok(module) => module,
        Err(MigrateError::Parse { line, message, .. }) => {
            return ValidationOutcome {
                valid: false,
                issues: vec![Issue::error(IssueKind::ParseError, Some(line), message)],
            };
        }
        Err(err) => {
            return ValidationOutcome {
                valid: false,
                issues: vec![Issue::error(IssueKind::Io, None, err.to_string())],
            };
        }
    };

    let mut scanner = LegacyScanner {
        rules,
        source,
        issues: Vec::new(),
    };
    for stmt in &module.body {
        scanner.visit_stmt(stmt);
    }
    ValidationOutcome {
        valid: true,
        issues: scanner.issues,
    }
}

pub fn validate_file(rules: &RuleTable, path: &Path) -> ValidationOutcome {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            return ValidationOutcome {
                valid: false,
                issues: vec![Issue::error(
                    IssueKind::Io,
                    None,
                    format!("failed to read file: {e}"),
                )],
            };
        }
    };
    let source = match String::from_utf8(bytes) {
        Ok(source) => source,
        Err(_) => {
            return ValidationOutcome {
                valid: false,
                issues: vec![Issue::error(
                    IssueKind::DecodeError,
                    None,
                    "file is not valid UTF-8",
                )],
            };
        }
    };
    validate_source(rules, path, &source)
}

struct LegacyScanner<'r> {
    rules: &'r RuleTable,
    source: &'r str,
    issues: Vec<Issue>,
}

impl<'a> Visitor<'a> for LegacyScanner<'_> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Import(imp) => {
                for alias in &imp.names {
                    let name = alias.name.as_str();
                    if let Some(target) = self.rules.module_target(name) {
                        self.issues.push(Issue::warning(
                            IssueKind::UnsafeRewrite,
                            Some(line_of(self.source, alias.range().start())),
                            format!("legacy Airflow 1.x import `{name}` (migrates to `{target}`)"),
                        ));
                    }
                }
            }
            Stmt::ImportFrom(imp) if imp.level == 0 => {
                if let Some(module) = &imp.module {
                    let module = module.as_str();
                    for alias in &imp.names {
                        let symbol = alias.name.as_str();
                        let qualified = format!("{module}.{symbol}");
                        let target = self
                            .rules
                            .symbol_target(&qualified)
                            .or_else(|| self.rules.module_target(module));
                        if let Some(target) = target {
                            self.issues.push(Issue::warning(
                                IssueKind::UnsafeRewrite,
                                Some(line_of(self.source, alias.range().start())),
                                format!(
                                    "legacy Airflow 1.x import `{qualified}` (migrates to `{target}`)"
                                ),
                            ));
                        }
                    }
                }
            }
            _ => {}
        }
        visitor::walk_stmt(self, stmt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_file_is_valid() {
        let outcome = validate_source(
            &RuleTable::airflow(),
            Path::new("dag.py"),
            "from airflow.operators.bash import BashOperator\n",
        );
        assert!(outcome.valid);
        assert!(outcome.issues.is_empty());
    }

    #[test]
    fn test_syntax_error_is_invalid() {
        let outcome = validate_source(&RuleTable::airflow(), Path::new("dag.py"), "def broken(:\n");
        assert!(!outcome.valid);
        assert_eq!(outcome.issues.len(), 1);
        assert_eq!(outcome.issues[0].kind, IssueKind::ParseError);
    }

    #[test]
    fn test_legacy_import_is_reported() {
        let outcome = validate_source(
            &RuleTable::airflow(),
            Path::new("dag.py"),
            "from airflow.operators.bash_operator import BashOperator\n\
             import airflow.contrib.hooks.gcs_hook\n",
        );
        assert!(outcome.valid);
        assert_eq!(outcome.issues.len(), 2);
        assert!(outcome.issues[0]
            .message
            .contains("airflow.operators.bash_operator.BashOperator"));
        assert_eq!(outcome.issues[1].line, Some(2));
    }
}
