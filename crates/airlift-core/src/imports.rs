//! Import statement rewriting.
//!
//! `from airflow.operators.bash_operator import BashOperator` becomes
//! `from airflow.operators.bash import BashOperator`, and so on for every
//! relocation in the rule table. Statements the table does not match are
//! carried over byte for byte, comments and spacing included.

use std::path::Path;

use ruff_python_ast::visitor::{self, Visitor};
use ruff_python_ast::{Stmt, StmtImport, StmtImportFrom};
use ruff_text_size::Ranged;

use crate::edit::{apply_edits, line_of, SourceEdit};
use crate::error::MigrateError;
use crate::issue::{Issue, IssueKind};
use crate::python;
use crate::rules::RuleTable;

/// Rewrite every import statement matched by `rules`, returning the new
/// source along with any warnings recorded on the way. Pure text to text;
/// `path` is only used to label parse errors.
pub fn transform_imports(
    rules: &RuleTable,
    path: &Path,
    source: &str,
) -> Result<(String, Vec<Issue>), MigrateError> {
    let module = python::parse(path, source)?;
    let mut rewriter = ImportRewriter {
        rules,
        source,
        edits: Vec::new(),
        issues: Vec::new(),
    };
    for stmt in &module.body {
        rewriter.visit_stmt(stmt);
    }
    Ok((apply_edits(source, rewriter.edits), rewriter.issues))
}

struct ImportRewriter<'r> {
    rules: &'r RuleTable,
    source: &'r str,
    edits: Vec<SourceEdit>,
    issues: Vec<Issue>,
}

impl<'a> Visitor<'a> for ImportRewriter<'_> {
    fn visit_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Import(imp) => self.rewrite_import(imp),
            Stmt::ImportFrom(imp) => self.rewrite_import_from(imp),
            _ => {}
        }
        visitor::walk_stmt(self, stmt);
    }
}

impl ImportRewriter<'_> {
    fn rewrite_import(&mut self, imp: &StmtImport) {
        let mut changed = false;
        let mut parts = Vec::with_capacity(imp.names.len());
        for alias in &imp.names {
            let name = alias.name.as_str();
            let asname = alias.asname.as_ref().map(|a| a.as_str());
            match self.rules.module_target(name) {
                Some(new_module) => {
                    changed = true;
                    if asname.is_none() {
                        // Without an alias, attribute references elsewhere in
                        // the file still spell the old module path.
                        self.issues.push(Issue::warning(
                            IssueKind::UnsafeRewrite,
                            Some(line_of(self.source, alias.range().start())),
                            format!(
                                "`import {name}` rewritten to `import {new_module}`; \
                                 references to `{name}.*` need manual review"
                            ),
                        ));
                    }
                    parts.push(render_alias(new_module, asname));
                }
                None => parts.push(render_alias(name, asname)),
            }
        }
        if changed {
            self.edits.push(SourceEdit::replace(
                imp.range(),
                format!("import {}", parts.join(", ")),
            ));
        }
    }

    fn rewrite_import_from(&mut self, imp: &StmtImportFrom) {
        if imp.level != 0 {
            return;
        }
        let Some(module) = &imp.module else { return };
        let module = module.as_str();

        // One output statement per target module, in first-seen order. The
        // original module keeps a statement of its own whenever any symbol
        // stays behind, so nothing is ever dropped.
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        let mut changed = false;

        for alias in &imp.names {
            let symbol = alias.name.as_str();
            let asname = alias.asname.as_ref().map(|a| a.as_str());

            if symbol != "*" {
                if let Some(target) = self.rules.symbol_target(&format!("{module}.{symbol}")) {
                    if let Some((new_module, new_symbol)) = target.rsplit_once('.') {
                        let rendered = match asname {
                            Some(a) => format!("{new_symbol} as {a}"),
                            // The relocation renamed the symbol itself; alias
                            // it back so call sites keep resolving.
                            None if new_symbol != symbol => {
                                format!("{new_symbol} as {symbol}")
                            }
                            None => new_symbol.to_string(),
                        };
                        push_group(&mut groups, new_module, rendered);
                        changed = true;
                        continue;
                    }
                }
            }

            if let Some(new_module) = self.rules.module_target(module) {
                push_group(&mut groups, new_module, render_alias(symbol, asname));
                changed = true;
            } else {
                push_group(&mut groups, module, render_alias(symbol, asname));
            }
        }

        if !changed {
            return;
        }

        let separator = self.statement_separator(usize::from(imp.range().start()));
        let replacement = groups
            .iter()
            .map(|(m, names)| format!("from {m} import {}", names.join(", ")))
            .collect::<Vec<_>>()
            .join(&separator);
        self.edits.push(SourceEdit::replace(imp.range(), replacement));
    }

    /// Separator used when one import statement splits into several. Normal
    /// statements continue on the next line at the same indentation; the
    /// degenerate `x = 1; from ...` case falls back to `; `.
    fn statement_separator(&self, stmt_start: usize) -> String {
        let line_start = self.source[..stmt_start]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let prefix = &self.source[line_start..stmt_start];
        if prefix.chars().all(|c| c == ' ' || c == '\t') {
            format!("\n{prefix}")
        } else {
            "; ".to_string()
        }
    }
}

fn render_alias(name: &str, asname: Option<&str>) -> String {
    match asname {
        Some(a) => format!("{name} as {a}"),
        None => name.to_string(),
    }
}

fn push_group(groups: &mut Vec<(String, Vec<String>)>, module: &str, rendered: String) {
    if let Some((_, names)) = groups.iter_mut().find(|(m, _)| m == module) {
        names.push(rendered);
    } else {
        groups.push((module.to_string(), vec![rendered]));
    }
}
