//! Chatweave Client Library
//!
//! Network backend and async orchestration for canvas nodes: single and
//! batched completions plus merge summaries, all against a shared store.

pub mod backend;
pub mod ops;

pub use backend::{CompletionBackend, CompletionError, HttpBackend};
pub use ops::{SharedStore, merge_nodes, run_batch, run_node};
