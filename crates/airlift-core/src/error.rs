use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("{}:{line}: parse error: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("conflicting rule for `{key}`: maps to both `{existing}` and `{replacement}`")]
    RuleConflict {
        key: String,
        existing: String,
        replacement: String,
    },

    #[error("rule target `{target}` for `{key}` is itself a rule key; a second pass would rewrite it again")]
    RuleNotIdempotent { key: String, target: String },

    #[error("invalid exclusion glob `{pattern}`: {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
