//! Tree resolver service
//!
//! Attaches an answer and a confidence to every node of a built tree.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use crate::application::retry::CallPolicy;
use crate::domain::{NodePath, QuestionNode, Resolution};
use crate::infrastructure::traits::Oracle;

/// Summary of one resolve pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolveReport {
    pub total: usize,
    pub answered: usize,
    pub failed: usize,
}

impl ResolveReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Service for resolving every node of a tree.
pub struct TreeResolver {
    oracle: Arc<dyn Oracle>,
    concurrency: usize,
    call: CallPolicy,
}

impl TreeResolver {
    pub fn new(oracle: Arc<dyn Oracle>, concurrency: usize, call: CallPolicy) -> Self {
        Self {
            oracle,
            concurrency: concurrency.max(1),
            call,
        }
    }

    /// Resolve all nodes in breadth-first order, overwriting earlier results.
    ///
    /// Calls are issued in BFS order with at most `concurrency` in flight.
    /// A failing node gets the unresolved sentinel; the pass always completes.
    #[instrument(level = "debug", skip(self, root), fields(root = %root.text()))]
    pub async fn resolve(&self, root: &mut QuestionNode) -> ResolveReport {
        let jobs: Vec<(NodePath, String)> = root
            .bfs_paths()
            .into_iter()
            .zip(root.iter_bfs().map(|n| n.text().to_string()))
            .collect();
        let mut report = ResolveReport {
            total: jobs.len(),
            ..ResolveReport::default()
        };
        debug!(total = report.total, concurrency = self.concurrency, "resolve: starting");

        let oracle = &self.oracle;
        let call = &self.call;
        let mut results = stream::iter(jobs)
            .map(|(path, question)| async move {
                let q = question.as_str();
                let outcome = call.run("resolve", move || oracle.resolve(q)).await;
                (path, question, outcome)
            })
            .buffered(self.concurrency);

        while let Some((path, question, outcome)) = results.next().await {
            let resolution = match outcome {
                Ok(verdict) => {
                    report.answered += 1;
                    info!(level = path.len(), score = verdict.score, "resolved: {}", question);
                    Resolution::answered(verdict)
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(level = path.len(), %e, "unresolved: {}", question);
                    Resolution::failed(e.to_string())
                }
            };
            if let Some(node) = root.node_at_mut(&path) {
                node.set_resolution(resolution);
            }
        }

        debug!(?report, "resolve: done");
        report
    }
}
