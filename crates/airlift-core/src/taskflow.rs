//! TaskFlow conversion: `PythonOperator` call sites rewritten into
//! decorator-style task invocations.
//!
//! Eligibility is decided by a purely lexical same-file scan; DAG code is
//! never imported or executed. A `PythonOperator` converts only when its
//! callable is a plain module-scope function referenced nowhere else and the
//! call carries nothing beyond `task_id` / `python_callable` / `op_kwargs`.
//! Anything else stays exactly as written, with a warning saying why.

use std::collections::HashMap;
use std::path::Path;

use ruff_python_ast::visitor::{self, Visitor};
use ruff_python_ast::{Expr, ExprCall, ModModule, Stmt, StmtFunctionDef};
use ruff_text_size::{Ranged, TextSize};

use crate::edit::{apply_edits, line_of, SourceEdit};
use crate::error::MigrateError;
use crate::issue::{Issue, IssueKind};
use crate::python;

const TASK_DECORATOR_IMPORT: &str = "from airflow.decorators import task";

/// Convert every eligible `PythonOperator` call in `source` to TaskFlow
/// style. Ineligible calls are left verbatim and explained in the returned
/// issues.
pub fn convert_to_taskflow(
    path: &Path,
    source: &str,
) -> Result<(String, Vec<Issue>), MigrateError> {
    let module = python::parse(path, source)?;

    let mut functions: HashMap<&str, &StmtFunctionDef> = HashMap::new();
    for stmt in &module.body {
        if let Stmt::FunctionDef(def) = stmt {
            functions.insert(def.name.as_str(), def);
        }
    }

    let mut collector = CallCollector::default();
    for stmt in &module.body {
        collector.visit_stmt(stmt);
    }

    let mut issues = Vec::new();
    let mut plans = Vec::new();
    for call in &collector.calls {
        match plan_conversion(source, call, &functions, &collector.name_counts) {
            Ok(plan) => plans.push(plan),
            Err(reason) => issues.push(Issue::warning(
                IssueKind::UnsafeRewrite,
                Some(line_of(source, call.range().start())),
                format!("skipped TaskFlow conversion: {reason}"),
            )),
        }
    }

    if plans.is_empty() {
        return Ok((source.to_owned(), issues));
    }

    // The import edit goes first so that, at equal offsets, it lands above
    // an inserted decorator.
    let mut edits = Vec::new();
    if !has_task_decorator_import(&module) {
        edits.push(task_import_edit(source, &module));
    }
    for plan in plans {
        edits.push(plan.decorator);
        edits.push(plan.call);
    }

    Ok((apply_edits(source, edits), issues))
}

#[derive(Default)]
struct CallCollector<'a> {
    calls: Vec<&'a ExprCall>,
    name_counts: HashMap<&'a str, usize>,
}

impl<'a> Visitor<'a> for CallCollector<'a> {
    fn visit_expr(&mut self, expr: &'a Expr) {
        match expr {
            Expr::Call(call) => {
                if python::call_class_name(&call.func) == Some("PythonOperator") {
                    self.calls.push(call);
                }
            }
            Expr::Name(name) => {
                *self.name_counts.entry(name.id.as_str()).or_insert(0) += 1;
            }
            _ => {}
        }
        visitor::walk_expr(self, expr);
    }
}

struct Plan {
    decorator: SourceEdit,
    call: SourceEdit,
}

fn plan_conversion(
    source: &str,
    call: &ExprCall,
    functions: &HashMap<&str, &StmtFunctionDef>,
    name_counts: &HashMap<&str, usize>,
) -> Result<Plan, String> {
    if !call.arguments.args.is_empty() {
        return Err("positional arguments are not convertible".to_string());
    }

    let mut callable = None;
    let mut task_id_expr = None;
    let mut op_kwargs_expr = None;
    for kw in call.arguments.keywords.iter() {
        let Some(name) = &kw.arg else {
            return Err("argument unpacking hides the operator's parameters".to_string());
        };
        match name.as_str() {
            "python_callable" => callable = Some(&kw.value),
            "task_id" => task_id_expr = Some(&kw.value),
            "op_kwargs" => op_kwargs_expr = Some(&kw.value),
            "provide_context" => {
                return Err("provide_context is implicit in TaskFlow".to_string());
            }
            other => return Err(format!("unsupported parameter `{other}`")),
        }
    }

    let Some(callable) = callable else {
        return Err("missing python_callable".to_string());
    };
    let Expr::Name(callable_name) = callable else {
        return Err("python_callable is not a plain function reference".to_string());
    };
    let fn_name = callable_name.id.as_str();
    let Some(def) = functions.get(fn_name) else {
        return Err(format!(
            "`{fn_name}` is not defined at module scope in this file"
        ));
    };
    if name_counts.get(fn_name).copied().unwrap_or(0) != 1 {
        return Err(format!(
            "`{fn_name}` is referenced by more than one task or expression"
        ));
    }
    if !def.decorator_list.is_empty() {
        return Err(format!("`{fn_name}` already carries decorators"));
    }

    let task_id = match task_id_expr {
        Some(expr) => Some(
            python::string_literal_value(expr)
                .ok_or_else(|| "task_id is not a string literal".to_string())?,
        ),
        None => None,
    };

    let mut call_args = Vec::new();
    if let Some(expr) = op_kwargs_expr {
        let Expr::Dict(dict) = expr else {
            return Err("op_kwargs is not a literal dict".to_string());
        };
        for item in &dict.items {
            let key = item
                .key
                .as_ref()
                .and_then(python::string_literal_value)
                .filter(|k| python::is_identifier(k))
                .ok_or_else(|| "op_kwargs keys must be literal identifiers".to_string())?;
            let value = &source[item.value.range()];
            call_args.push(format!("{key}={value}"));
        }
    }

    let decorator_text = match task_id {
        Some(id) if id != fn_name => format!("@task(task_id=\"{id}\")\n"),
        _ => "@task\n".to_string(),
    };
    let def_line_start = source[..usize::from(def.range().start())]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);

    Ok(Plan {
        decorator: SourceEdit::insert(TextSize::from(def_line_start as u32), decorator_text),
        call: SourceEdit::replace(
            call.range(),
            format!("{fn_name}({})", call_args.join(", ")),
        ),
    })
}

fn has_task_decorator_import(module: &ModModule) -> bool {
    module.body.iter().any(|stmt| {
        matches!(stmt, Stmt::ImportFrom(imp)
            if imp.level == 0
                && imp.module.as_ref().is_some_and(|m| m.as_str() == "airflow.decorators")
                && imp.names.iter().any(|a| a.name.as_str() == "task" && a.asname.is_none()))
    })
}

/// Insert the decorator import after the last top-level import, falling
/// back to after a module docstring, then to the top of the file.
fn task_import_edit(source: &str, module: &ModModule) -> SourceEdit {
    let mut anchor = None;
    for stmt in &module.body {
        if matches!(stmt, Stmt::Import(_) | Stmt::ImportFrom(_)) {
            anchor = Some(stmt.range().end());
        }
    }
    if anchor.is_none() {
        if let Some(Stmt::Expr(expr)) = module.body.first() {
            if python::string_literal_value(&expr.value).is_some() {
                anchor = Some(expr.range().end());
            }
        }
    }

    match anchor {
        Some(end) => {
            let off = usize::from(end);
            match source[off..].find('\n') {
                Some(i) => SourceEdit::insert(
                    TextSize::from((off + i + 1) as u32),
                    format!("{TASK_DECORATOR_IMPORT}\n"),
                ),
                None => SourceEdit::insert(
                    TextSize::from(source.len() as u32),
                    format!("\n{TASK_DECORATOR_IMPORT}\n"),
                ),
            }
        }
        None => SourceEdit::insert(TextSize::from(0), format!("{TASK_DECORATOR_IMPORT}\n")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Severity;

    fn convert(source: &str) -> (String, Vec<Issue>) {
        convert_to_taskflow(Path::new("dag.py"), source).unwrap()
    }

    #[test]
    fn test_simple_conversion() {
        let source = "from airflow.operators.python import PythonOperator\n\
                      \n\
                      def greet():\n\
                      \x20   print(\"hi\")\n\
                      \n\
                      t = PythonOperator(task_id=\"greet\", python_callable=greet)\n";
        let (out, issues) = convert(source);
        assert_eq!(
            out,
            "from airflow.operators.python import PythonOperator\n\
             from airflow.decorators import task\n\
             \n\
             @task\n\
             def greet():\n\
             \x20   print(\"hi\")\n\
             \n\
             t = greet()\n"
        );
        assert!(issues.is_empty());
    }

    #[test]
    fn test_divergent_task_id_kept_on_decorator() {
        let source = "def compute():\n\
                      \x20   return 1\n\
                      \n\
                      t = PythonOperator(task_id=\"crunch\", python_callable=compute)\n";
        let (out, _) = convert(source);
        assert!(out.contains("@task(task_id=\"crunch\")\ndef compute():"));
        assert!(out.contains("t = compute()\n"));
    }

    #[test]
    fn test_op_kwargs_become_call_arguments() {
        let source = "def greet():\n\
                      \x20   pass\n\
                      \n\
                      t = PythonOperator(task_id=\"greet\", python_callable=greet, op_kwargs={\"name\": \"world\", \"retries\": 2})\n";
        let (out, issues) = convert(source);
        assert!(out.contains("t = greet(name=\"world\", retries=2)\n"));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_shared_callable_is_not_converted() {
        let source = "def work():\n\
                      \x20   pass\n\
                      \n\
                      a = PythonOperator(task_id=\"a\", python_callable=work)\n\
                      b = PythonOperator(task_id=\"b\", python_callable=work)\n";
        let (out, issues) = convert(source);
        assert_eq!(out, source);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| {
            i.severity == Severity::Warning
                && i.kind == IssueKind::UnsafeRewrite
                && i.message.contains("more than one task")
        }));
    }

    #[test]
    fn test_op_args_block_conversion() {
        let source = "def work():\n\
                      \x20   pass\n\
                      \n\
                      t = PythonOperator(task_id=\"t\", python_callable=work, op_args=[1])\n";
        let (out, issues) = convert(source);
        assert_eq!(out, source);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("unsupported parameter `op_args`"));
    }

    #[test]
    fn test_dynamic_callable_blocks_conversion() {
        let source = "t = PythonOperator(task_id=\"t\", python_callable=lambda: 1)\n";
        let (out, issues) = convert(source);
        assert_eq!(out, source);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("plain function reference"));
    }

    #[test]
    fn test_provide_context_blocks_conversion() {
        let source = "def work():\n\
                      \x20   pass\n\
                      \n\
                      t = PythonOperator(task_id=\"t\", python_callable=work, provide_context=True)\n";
        let (out, issues) = convert(source);
        assert_eq!(out, source);
        assert!(issues[0].message.contains("provide_context"));
    }

    #[test]
    fn test_nested_function_is_out_of_scope() {
        let source = "def outer():\n\
                      \x20   def inner():\n\
                      \x20       pass\n\
                      \x20   return inner\n\
                      \n\
                      t = PythonOperator(task_id=\"t\", python_callable=inner)\n";
        let (out, issues) = convert(source);
        assert_eq!(out, source);
        assert!(issues[0].message.contains("not defined at module scope"));
    }

    #[test]
    fn test_existing_decorator_import_is_not_duplicated() {
        let source = "from airflow.decorators import task\n\
                      \n\
                      def greet():\n\
                      \x20   pass\n\
                      \n\
                      t = PythonOperator(task_id=\"greet\", python_callable=greet)\n";
        let (out, _) = convert(source);
        assert_eq!(out.matches(TASK_DECORATOR_IMPORT).count(), 1);
        assert!(out.contains("@task\ndef greet():"));
    }

    #[test]
    fn test_bare_statement_call_converts() {
        let source = "def ping():\n\
                      \x20   pass\n\
                      \n\
                      PythonOperator(task_id=\"ping\", python_callable=ping)\n";
        let (out, issues) = convert(source);
        assert!(out.contains("@task\ndef ping():"));
        assert!(out.ends_with("ping()\n"));
        assert!(issues.is_empty());
    }

    #[test]
    fn test_second_pass_is_identity() {
        let source = "def greet():\n\
                      \x20   pass\n\
                      \n\
                      t = PythonOperator(task_id=\"greet\", python_callable=greet)\n";
        let (once, _) = convert(source);
        let (twice, issues) = convert(&once);
        assert_eq!(once, twice);
        assert!(issues.is_empty());
    }
}
