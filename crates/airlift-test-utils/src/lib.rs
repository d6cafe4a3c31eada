//! Scratch DAG trees for migration tests.
//!
//! A [`DagSandbox`] is a tempdir holding a `dags/` source tree and a
//! `migrated/` target tree. Everything is cleaned up on drop.
//!
//! ```no_run
//! use airlift_test_utils::DagSandbox;
//!
//! let sandbox = DagSandbox::new();
//! sandbox.add_dag("etl.py", "import os\n");
//! // run a migration from sandbox.source_dir() to sandbox.target_dir() ...
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct DagSandbox {
    root: TempDir,
    source: PathBuf,
    target: PathBuf,
}

impl DagSandbox {
    pub fn new() -> Self {
        let root = TempDir::new().expect("create sandbox TempDir");
        let source = root.path().join("dags");
        let target = root.path().join("migrated");
        fs::create_dir_all(&source).expect("create source dir");
        fs::create_dir_all(&target).expect("create target dir");
        Self {
            root,
            source,
            target,
        }
    }

    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    pub fn source_dir(&self) -> &Path {
        &self.source
    }

    pub fn target_dir(&self) -> &Path {
        &self.target
    }

    /// Write a DAG file under the source tree, creating parent directories.
    pub fn add_dag(&self, rel: &str, content: &str) -> PathBuf {
        self.add_raw(rel, content.as_bytes())
    }

    /// Write arbitrary bytes under the source tree (for non-UTF-8 cases).
    pub fn add_raw(&self, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = self.source.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dag parent dir");
        }
        fs::write(&path, bytes).expect("write dag file");
        path
    }

    pub fn source_path(&self, rel: &str) -> PathBuf {
        self.source.join(rel)
    }

    pub fn target_path(&self, rel: &str) -> PathBuf {
        self.target.join(rel)
    }

    /// Read a migrated file back out of the target tree.
    pub fn read_target(&self, rel: &str) -> String {
        fs::read_to_string(self.target.join(rel)).expect("read migrated file")
    }
}

impl Default for DagSandbox {
    fn default() -> Self {
        Self::new()
    }
}
