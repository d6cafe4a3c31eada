//! Operator call-site rewriting.
//!
//! Deprecated keyword arguments are deleted (comma and all) or renamed in
//! place. Value expressions are never reformatted; a rename touches only the
//! argument-name token, so f-strings, nested calls, and multi-line layouts
//! come through untouched.

use std::path::Path;

use ruff_python_ast::visitor::{self, Visitor};
use ruff_python_ast::{Expr, ExprCall};
use ruff_text_size::{Ranged, TextRange, TextSize};

use crate::edit::{apply_edits, line_of, SourceEdit};
use crate::error::MigrateError;
use crate::issue::{Issue, IssueKind};
use crate::python;
use crate::rules::{ParamRule, RuleTable};

/// Rewrite deprecated keyword arguments at every call site of a class known
/// to `rules`. Calls of unknown classes are untouched.
pub fn transform_operators(
    rules: &RuleTable,
    path: &Path,
    source: &str,
) -> Result<(String, Vec<Issue>), MigrateError> {
    let module = python::parse(path, source)?;
    let mut rewriter = CallRewriter {
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

/// Transient view of one call expression: every argument in source order.
struct CallSite<'a> {
    class_name: &'a str,
    arguments: Vec<CallArg>,
    has_kwargs_expansion: bool,
}

enum CallArg {
    Positional {
        range: TextRange,
    },
    Keyword {
        name: String,
        name_range: TextRange,
        range: TextRange,
    },
}

impl CallArg {
    fn range(&self) -> TextRange {
        match self {
            CallArg::Positional { range } | CallArg::Keyword { range, .. } => *range,
        }
    }
}

impl<'a> CallSite<'a> {
    fn from_call(class_name: &'a str, call: &ExprCall) -> Self {
        let mut arguments: Vec<CallArg> = Vec::new();
        let mut has_kwargs_expansion = false;
        for arg in call.arguments.args.iter() {
            arguments.push(CallArg::Positional { range: arg.range() });
        }
        for kw in call.arguments.keywords.iter() {
            match &kw.arg {
                Some(name) => arguments.push(CallArg::Keyword {
                    name: name.as_str().to_string(),
                    name_range: name.range(),
                    range: kw.range(),
                }),
                None => has_kwargs_expansion = true,
            }
        }
        arguments.sort_by_key(|a| a.range().start());
        Self {
            class_name,
            arguments,
            has_kwargs_expansion,
        }
    }
}

struct CallRewriter<'r> {
    rules: &'r RuleTable,
    source: &'r str,
    edits: Vec<SourceEdit>,
    issues: Vec<Issue>,
}

impl<'a> Visitor<'a> for CallRewriter<'_> {
    fn visit_expr(&mut self, expr: &'a Expr) {
        if let Expr::Call(call) = expr {
            self.rewrite_call(call);
        }
        visitor::walk_expr(self, expr);
    }
}

impl CallRewriter<'_> {
    fn rewrite_call(&mut self, call: &ExprCall) {
        let Some(class_name) = python::call_class_name(&call.func) else {
            return;
        };
        if !self.rules.has_class(class_name) {
            return;
        }

        let site = CallSite::from_call(class_name, call);

        if site.has_kwargs_expansion {
            // An unpacked mapping could hide any of the deprecated
            // parameters; leave the whole call alone rather than guess.
            self.issues.push(Issue::warning(
                IssueKind::UnsafeRewrite,
                Some(line_of(self.source, call.range().start())),
                format!(
                    "cannot verify deprecated parameters behind **kwargs expansion \
                     in `{}(...)`",
                    site.class_name
                ),
            ));
            return;
        }

        let mut removed = vec![false; site.arguments.len()];
        for (idx, arg) in site.arguments.iter().enumerate() {
            let CallArg::Keyword {
                name, name_range, ..
            } = arg
            else {
                continue;
            };
            match self.rules.param_rule(class_name, name) {
                Some(ParamRule::Remove) => removed[idx] = true,
                Some(ParamRule::RenameTo(new_name)) => {
                    self.edits
                        .push(SourceEdit::replace(*name_range, new_name.clone()));
                }
                None => {}
            }
        }

        self.push_removal_edits(&site, &removed);
    }

    /// Deletion spans for removed arguments. Consecutive removed arguments
    /// collapse into one span so the surviving separators stay consistent.
    fn push_removal_edits(&mut self, site: &CallSite, removed: &[bool]) {
        let args = &site.arguments;
        let n = args.len();
        let mut i = 0;
        while i < n {
            if !removed[i] {
                i += 1;
                continue;
            }
            let mut j = i;
            while j + 1 < n && removed[j + 1] {
                j += 1;
            }
            let span = if j + 1 < n {
                // up to the next surviving argument, separator included
                TextRange::new(args[i].range().start(), args[j + 1].range().start())
            } else if i > 0 {
                // trailing run: delete backwards from the last survivor
                TextRange::new(args[i - 1].range().end(), args[j].range().end())
            } else {
                // every argument goes; swallow a trailing comma too
                let bytes = self.source.as_bytes();
                let mut end = usize::from(args[j].range().end());
                let mut k = end;
                while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if k < bytes.len() && bytes[k] == b',' {
                    end = k + 1;
                }
                TextRange::new(args[i].range().start(), TextSize::from(end as u32))
            };
            self.edits.push(SourceEdit::delete(span));
            i = j + 1;
        }
    }
}
