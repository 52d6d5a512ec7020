//! qtree: decompose a yes/no question into a tree of atomic subquestions and
//! resolve every node against an LLM oracle backed by NBA statistics.
//!
//! Layers, innermost first:
//! - [`domain`]: the question tree and its invariants
//! - [`application`]: build, resolve and persistence services
//! - [`infrastructure`]: HTTP adapters for the oracle and the statistics API
//! - [`cli`]: argument parsing and terminal output

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
