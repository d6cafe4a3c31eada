//! Shared helpers for parsing and inspecting Python source.

use std::path::Path;

use ruff_python_ast::{Expr, ModModule};

use crate::edit::line_of;
use crate::error::MigrateError;

/// Parse `source` as a Python module, mapping parser failures to
/// [`MigrateError::Parse`] with the offending file and line.
pub(crate) fn parse(path: &Path, source: &str) -> Result<ModModule, MigrateError> {
    ruff_python_parser::parse_module(source)
        .map(|parsed| parsed.into_syntax())
        .map_err(|err| MigrateError::Parse {
            path: path.to_path_buf(),
            line: line_of(source, err.location.start()),
            message: err.error.to_string(),
        })
}

/// The class name referenced by a call's callee: `BashOperator(...)` and
/// `operators.BashOperator(...)` both yield `BashOperator`.
pub(crate) fn call_class_name(func: &Expr) -> Option<&str> {
    match func {
        Expr::Name(name) => Some(name.id.as_str()),
        Expr::Attribute(attr) => Some(attr.attr.as_str()),
        _ => None,
    }
}

pub(crate) fn string_literal_value(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::StringLiteral(lit) => Some(lit.value.to_str()),
        _ => None,
    }
}

/// Whether `s` is usable as a Python keyword-argument name.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
