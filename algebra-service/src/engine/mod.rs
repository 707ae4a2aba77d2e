// Engine Module
// Operation trees, the expression resolver and its progress events

pub mod events;
pub mod resolver;
pub mod tree;

// Re-export key types
pub use events::{progress_channel, EventSender, ProgressReceiver, ProgressSender, ResolutionEvent};
pub use resolver::LinearAlgebraEngine;
pub use tree::{OperationNode, Operator};
