//! Tree builder service
//!
//! Expands a root question into a fixed-arity tree by repeated decomposition.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::application::retry::CallPolicy;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    expected_decompose_calls, DomainError, NodePath, QuestionNode, DEPTH_CEILING, FAN_OUT,
};
use crate::infrastructure::traits::Oracle;

/// What to do when a node cannot be decomposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPolicy {
    /// Abort the whole build and report the failure
    #[default]
    Abort,
    /// Leave the node childless, flag it, and keep building
    Partial,
}

/// Service for expanding a question into a tree.
pub struct TreeBuilder {
    oracle: Arc<dyn Oracle>,
    policy: BuildPolicy,
    call: CallPolicy,
    depth_limit: usize,
}

impl TreeBuilder {
    /// `depth_limit` is capped at [`DEPTH_CEILING`].
    pub fn new(
        oracle: Arc<dyn Oracle>,
        policy: BuildPolicy,
        call: CallPolicy,
        depth_limit: usize,
    ) -> Self {
        Self {
            oracle,
            policy,
            call,
            depth_limit: depth_limit.min(DEPTH_CEILING),
        }
    }

    /// Build the tree for `root_text` down to `max_depth`.
    ///
    /// Nodes are expanded depth-first, each node's subtree completed before
    /// its next sibling. Nodes at `max_depth` are leaves.
    #[instrument(level = "debug", skip(self))]
    pub async fn build(&self, root_text: &str, max_depth: usize) -> ApplicationResult<QuestionNode> {
        if max_depth > self.depth_limit {
            return Err(DomainError::DepthOutOfRange {
                depth: max_depth,
                limit: self.depth_limit,
            }
            .into());
        }
        let mut root = QuestionNode::root(root_text)?;
        let total = expected_decompose_calls(max_depth);
        debug!(total, policy = ?self.policy, "build: starting");

        let mut stack: Vec<NodePath> = vec![Vec::new()];
        let mut expanded = 0;

        while let Some(path) = stack.pop() {
            let (question, level) = match root.node_at(&path) {
                Some(node) => (node.text().to_string(), node.level()),
                None => {
                    return Err(DomainError::InvalidTree(format!("no node at {path:?}")).into())
                }
            };
            if level >= max_depth {
                continue;
            }

            match self.decompose(&question).await {
                Ok(subquestions) => {
                    let node = root.node_at_mut(&path).ok_or_else(|| {
                        DomainError::InvalidTree(format!("no node at {path:?}"))
                    })?;
                    node.attach_children(subquestions)?;
                    expanded += 1;
                    info!(level, expanded, total, "expanded: {}", question);

                    // Reverse push keeps the first child on top of the stack
                    for i in (0..FAN_OUT).rev() {
                        let mut child = path.clone();
                        child.push(i);
                        stack.push(child);
                    }
                }
                Err(e) if self.policy == BuildPolicy::Partial => {
                    warn!(level, %e, "leaving node unexpanded: {}", question);
                    if let Some(node) = root.node_at_mut(&path) {
                        node.mark_partial(e.to_string());
                    }
                }
                Err(e) => return Err(e),
            }
        }

        debug!(nodes = root.node_count(), complete = root.is_complete(), "build: done");
        Ok(root)
    }

    async fn decompose(&self, question: &str) -> ApplicationResult<Vec<String>> {
        let oracle = &self.oracle;
        let subquestions = self
            .call
            .run("decompose", move || oracle.decompose(question))
            .await?;
        if subquestions.len() != FAN_OUT {
            return Err(ApplicationError::Domain(DomainError::malformed(
                question,
                format!(
                    "expected {FAN_OUT} subquestions, got {}",
                    subquestions.len()
                ),
            )));
        }
        if let Some(pos) = subquestions.iter().position(|q| q.trim().is_empty()) {
            return Err(ApplicationError::Domain(DomainError::malformed(
                question,
                format!("subquestion {} is empty", pos + 1),
            )));
        }
        Ok(subquestions)
    }
}
