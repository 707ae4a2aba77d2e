// Result Sinks
// Output documents for resolved matrices or resolution errors

use crate::io::error::{TreeError, TreeResult};
use crate::memory::Grid;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Document written for one resolution: `{"result": ...}` or `{"error": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputDocument {
    Result(Grid),
    Error(String),
}

impl From<Result<Grid, String>> for OutputDocument {
    fn from(outcome: Result<Grid, String>) -> Self {
        match outcome {
            Ok(grid) => OutputDocument::Result(grid),
            Err(message) => OutputDocument::Error(message),
        }
    }
}

/// Receives the outcome of a resolution
pub trait ResultSink {
    fn accept(&mut self, outcome: Result<Grid, String>) -> TreeResult<()>;
}

/// Writes each outcome as a pretty-printed JSON document
pub struct JsonResultSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonResultSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonResultSink<W> {
    fn accept(&mut self, outcome: Result<Grid, String>) -> TreeResult<()> {
        let document = OutputDocument::from(outcome);
        serde_json::to_writer_pretty(&mut self.writer, &document)?;
        self.writer
            .write_all(b"\n")
            .and_then(|_| self.writer.flush())
            .map_err(|e| TreeError::io("<output>", e))
    }
}

/// Writes the output document to a file, replacing its contents
#[derive(Debug, Clone)]
pub struct FileResultSink {
    path: PathBuf,
}

impl FileResultSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for FileResultSink {
    fn accept(&mut self, outcome: Result<Grid, String>) -> TreeResult<()> {
        let file = File::create(&self.path).map_err(|e| TreeError::io(&self.path, e))?;
        let mut sink = JsonResultSink::new(BufWriter::new(file));
        sink.accept(outcome).map_err(|err| match err {
            TreeError::Io { source, .. } => TreeError::io(&self.path, source),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_result_document() {
        let mut sink = JsonResultSink::new(Vec::new());
        sink.accept(Ok(vec![vec![1.0, 2.5]])).unwrap();

        let written: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(written, serde_json::json!({"result": [[1.0, 2.5]]}));
    }

    #[test]
    fn test_error_document() {
        let mut sink = JsonResultSink::new(Vec::new());
        sink.accept(Err("Dimension mismatch: 2x3 by 2x2".to_string()))
            .unwrap();

        let written = String::from_utf8(sink.into_inner()).unwrap();
        let document: OutputDocument = serde_json::from_str(&written).unwrap();
        assert_eq!(
            document,
            OutputDocument::Error("Dimension mismatch: 2x3 by 2x2".to_string())
        );
    }

    #[test]
    fn test_file_sink_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        fs::write(&path, "stale contents that are longer than the result").unwrap();

        let mut sink = FileResultSink::new(&path);
        sink.accept(Ok(vec![vec![3.0]])).unwrap();

        let document: OutputDocument =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document, OutputDocument::Result(vec![vec![3.0]]));
    }

    #[test]
    fn test_file_sink_reports_unwritable_path() {
        let mut sink = FileResultSink::new("/nonexistent/dir/out.json");
        assert!(matches!(
            sink.accept(Ok(Vec::new())),
            Err(TreeError::Io { .. })
        ));
    }
}
