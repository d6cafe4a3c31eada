use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::WalkBuilder;

/// Walk directories and collect .py file paths into a Vec
///
/// Features:
/// - Always recursive traversal
/// - Always skips `__init__.py`
/// - Always respects git ignore patterns
/// - Returns deterministically sorted paths
pub fn collect_py_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let walk_paths: Vec<PathBuf> = if paths.is_empty() {
        vec![std::env::current_dir()?]
    } else {
        paths.to_vec()
    };

    let mut py_files = Vec::new();
    for root in walk_paths {
        for result in WalkBuilder::new(&root)
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .build()
        {
            let entry = result?;
            let path = entry.path();
            if path.is_file() && is_dag_file(path) {
                py_files.push(path.to_path_buf());
            }
        }
    }
    py_files.sort(); // Deterministic ordering
    Ok(py_files)
}

fn is_dag_file(path: &Path) -> bool {
    path.extension() == Some(OsStr::new("py"))
        && path.file_name() != Some(OsStr::new("__init__.py"))
}
