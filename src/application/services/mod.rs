//! Application services
//!
//! Concrete service implementations that orchestrate the question tree.
//! Services depend on the oracle boundary trait but are themselves concrete
//! structs, not traits.

mod builder;
mod resolver;
mod serializer;

pub use builder::{BuildPolicy, TreeBuilder};
pub use resolver::{ResolveReport, TreeResolver};
pub use serializer::TreeDocument;
