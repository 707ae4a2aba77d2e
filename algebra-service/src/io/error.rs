// Tree Document Errors
// Failures while reading operation trees or writing result documents

use std::path::PathBuf;
use thiserror::Error;

pub type TreeResult<T> = Result<T, TreeError>;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported document format '{0}' (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),

    #[error("Unknown operator '{operator}' at {at}")]
    UnknownOperator { at: String, operator: String },

    #[error("Missing argument '{field}' at {at}")]
    MissingArgument { at: String, field: String },

    #[error("Malformed node at {at}: {message}")]
    MalformedNode { at: String, message: String },
}

impl TreeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(at: &str, message: impl Into<String>) -> Self {
        Self::MalformedNode {
            at: at.to_string(),
            message: message.into(),
        }
    }

    pub fn missing(at: &str, field: &str) -> Self {
        Self::MissingArgument {
            at: at.to_string(),
            field: field.to_string(),
        }
    }
}
