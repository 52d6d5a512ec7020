//! Domain layer: the question tree and its invariants
//!
//! This layer is independent of external concerns (no I/O, no oracle calls, no config loading).

pub mod error;
pub mod node;
pub mod traversal;

pub use error::DomainError;
pub use node::{
    expected_decompose_calls, expected_node_count, Outcome, QuestionNode, Resolution, Verdict,
    DEPTH_CEILING, FAN_OUT, UNRESOLVED_ANSWER,
};
pub use traversal::NodePath;
