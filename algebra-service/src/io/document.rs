// Tree Document Parser
// Decodes JSON or YAML documents into operation trees

use crate::engine::tree::{OperationNode, Operator};
use crate::io::error::{TreeError, TreeResult};
use crate::memory::Grid;

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// Encoding of a tree document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> TreeResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            other => Err(TreeError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Anything that can produce an operation tree
pub trait TreeSource {
    fn load(&self) -> TreeResult<OperationNode>;
}

/// Tree document held in memory
#[derive(Debug, Clone)]
pub struct StrTreeSource {
    content: String,
    format: DocumentFormat,
}

impl StrTreeSource {
    pub fn new(content: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            content: content.into(),
            format,
        }
    }

    pub fn json(content: impl Into<String>) -> Self {
        Self::new(content, DocumentFormat::Json)
    }

    pub fn yaml(content: impl Into<String>) -> Self {
        Self::new(content, DocumentFormat::Yaml)
    }
}

impl TreeSource for StrTreeSource {
    fn load(&self) -> TreeResult<OperationNode> {
        TreeParser::parse(&self.content, self.format)
    }
}

/// Tree document on disk; the format follows the file extension
#[derive(Debug, Clone)]
pub struct FileTreeSource {
    path: PathBuf,
}

impl FileTreeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TreeSource for FileTreeSource {
    fn load(&self) -> TreeResult<OperationNode> {
        TreeParser::parse_file(&self.path)
    }
}

/// Operation tree document parser
pub struct TreeParser;

impl TreeParser {
    /// Parse a tree from a string in the given format
    pub fn parse(content: &str, format: DocumentFormat) -> TreeResult<OperationNode> {
        let value: Value = match format {
            DocumentFormat::Json => serde_json::from_str(content)?,
            DocumentFormat::Yaml => serde_yaml::from_str(content)?,
        };
        decode_node(&value, "$")
    }

    /// Parse a tree from a file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> TreeResult<OperationNode> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let content = fs::read_to_string(path).map_err(|e| TreeError::io(path, e))?;
        Self::parse(&content, format)
    }
}

fn decode_node(value: &Value, at: &str) -> TreeResult<OperationNode> {
    match value {
        Value::Array(rows) => decode_matrix(rows, at).map(OperationNode::Matrix),
        Value::Object(fields) => decode_operation(fields, at),
        Value::Null => Err(TreeError::missing(at, "node")),
        other => Err(TreeError::malformed(
            at,
            format!(
                "expected a matrix or an operation, found {}",
                describe(other)
            ),
        )),
    }
}

fn decode_operation(fields: &Map<String, Value>, at: &str) -> TreeResult<OperationNode> {
    let symbol = match fields.get("operator") {
        None | Some(Value::Null) => return Err(TreeError::missing(at, "operator")),
        Some(Value::String(symbol)) => symbol,
        Some(other) => {
            return Err(TreeError::malformed(
                at,
                format!("operator must be a string, found {}", describe(other)),
            ))
        }
    };
    let operator: Operator = symbol.parse().map_err(|_| TreeError::UnknownOperator {
        at: at.to_string(),
        operator: symbol.clone(),
    })?;

    let operands = match fields.get("operands") {
        None | Some(Value::Null) => return Err(TreeError::missing(at, "operands")),
        Some(Value::Array(operands)) => operands,
        Some(other) => {
            return Err(TreeError::malformed(
                at,
                format!("operands must be a list, found {}", describe(other)),
            ))
        }
    };
    if operands.is_empty() {
        return Err(TreeError::missing(at, "operands"));
    }

    let children = operands
        .iter()
        .enumerate()
        .map(|(index, operand)| decode_node(operand, &format!("{}.operands[{}]", at, index)))
        .collect::<TreeResult<Vec<_>>>()?;

    Ok(OperationNode::operation(operator, children))
}

fn decode_matrix(rows: &[Value], at: &str) -> TreeResult<Grid> {
    if rows.is_empty() {
        return Err(TreeError::missing(at, "matrix"));
    }

    rows.iter()
        .enumerate()
        .map(|(row_index, row)| {
            let Value::Array(values) = row else {
                return Err(TreeError::malformed(
                    at,
                    format!("row {} must be a list of numbers", row_index),
                ));
            };
            values
                .iter()
                .enumerate()
                .map(|(column, value)| {
                    value.as_f64().ok_or_else(|| {
                        TreeError::malformed(
                            at,
                            format!(
                                "element [{}][{}] must be a number, found {}",
                                row_index,
                                column,
                                describe(value)
                            ),
                        )
                    })
                })
                .collect()
        })
        .collect()
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
