//! Source-to-source migration engine for Apache Airflow DAG files.
//!
//! Rewrites Airflow 1.10.x DAG definitions into their 2.x form: import
//! paths are remapped, deprecated operator parameters are dropped or
//! renamed, and eligible `PythonOperator` usages can be converted to the
//! decorator-based TaskFlow style. Every rewrite is a span edit against the
//! parsed AST, so source the engine does not touch survives byte for byte.

pub mod edit;
pub mod error;
pub mod imports;
pub mod issue;
pub mod migrator;
pub mod operators;
mod python;
pub mod report;
pub mod rules;
pub mod taskflow;
pub mod validate;

pub use error::MigrateError;
pub use imports::transform_imports;
pub use issue::{Issue, IssueKind, Severity};
pub use migrator::{DagMigrator, MigrateOptions, SourceUnit, Stage};
pub use operators::transform_operators;
pub use report::{MigrationReport, MigrationResult, MigrationStatus, ReportStatus};
pub use rules::{ParamRule, RuleTable};
pub use taskflow::convert_to_taskflow;
pub use validate::{validate_file, validate_source, ValidationOutcome};
