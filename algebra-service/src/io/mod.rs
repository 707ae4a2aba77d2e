// Document I/O Module
// Tree sources and result sinks over JSON and YAML documents

pub mod document;
pub mod error;
pub mod sink;

// Re-export key types
pub use document::{DocumentFormat, FileTreeSource, StrTreeSource, TreeParser, TreeSource};
pub use error::{TreeError, TreeResult};
pub use sink::{FileResultSink, JsonResultSink, OutputDocument, ResultSink};
