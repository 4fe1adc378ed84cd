//! Evaluation Strategies
//!
//! Single queries go through [`QueryEngine`](crate::QueryEngine) directly.
//! Batches of independent evaluations go through [`parallel`].

pub mod parallel;

pub use parallel::{evaluate_documents, evaluate_parallel, xmap};
