//! Tree traversal: breadth-first and pre-order iteration, path addressing,
//! and per-level statistics.

use std::collections::{BTreeMap, VecDeque};

use termtree::Tree;
use tracing::instrument;

use crate::domain::node::QuestionNode;

/// Child-index path from the root to a node. The root has an empty path.
pub type NodePath = Vec<usize>;

impl QuestionNode {
    /// Breadth-first iterator: root, then level 1 left to right, and so on.
    pub fn iter_bfs(&self) -> BreadthFirst<'_> {
        BreadthFirst::new(self)
    }

    /// Depth-first pre-order iterator, children left to right.
    pub fn iter_preorder(&self) -> PreOrder<'_> {
        PreOrder::new(self)
    }

    /// Paths of all nodes in breadth-first order.
    #[instrument(level = "trace", skip(self))]
    pub fn bfs_paths(&self) -> Vec<NodePath> {
        let mut paths = Vec::new();
        let mut queue: VecDeque<(&QuestionNode, NodePath)> = VecDeque::new();
        queue.push_back((self, Vec::new()));

        while let Some((node, path)) = queue.pop_front() {
            for (i, child) in node.children().iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(i);
                queue.push_back((child, child_path));
            }
            paths.push(path);
        }
        paths
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&QuestionNode> {
        path.iter()
            .try_fold(self, |node, &i| node.children().get(i))
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut QuestionNode> {
        let mut node = self;
        for &i in path {
            node = node.children_mut().get_mut(i)?;
        }
        Some(node)
    }

    pub fn node_count(&self) -> usize {
        self.iter_bfs().count()
    }

    /// Number of levels in the tree (a lone root has depth 1).
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(QuestionNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Node count per level.
    pub fn level_counts(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for node in self.iter_bfs() {
            *counts.entry(node.level()).or_insert(0) += 1;
        }
        counts
    }

    /// Render the tree with answers for terminal display.
    pub fn to_display_tree(&self) -> Tree<String> {
        Tree::new(node_label(self)).with_leaves(
            self.children()
                .iter()
                .map(QuestionNode::to_display_tree)
                .collect::<Vec<_>>(),
        )
    }
}

fn node_label(node: &QuestionNode) -> String {
    match node.resolution() {
        Some(r) if r.is_failure() => format!("{} [unresolved]", node.text()),
        Some(r) => format!("{} [{:.2}]", node.text(), r.confidence),
        None if node.expansion_error().is_some() => format!("{} [not expanded]", node.text()),
        None => node.text().to_string(),
    }
}

pub struct BreadthFirst<'a> {
    queue: VecDeque<&'a QuestionNode>,
}

impl<'a> BreadthFirst<'a> {
    fn new(root: &'a QuestionNode) -> Self {
        Self {
            queue: VecDeque::from([root]),
        }
    }
}

impl<'a> Iterator for BreadthFirst<'a> {
    type Item = &'a QuestionNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.queue.extend(node.children());
        Some(node)
    }
}

pub struct PreOrder<'a> {
    stack: Vec<&'a QuestionNode>,
}

impl<'a> PreOrder<'a> {
    fn new(root: &'a QuestionNode) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a QuestionNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push children in reverse order for left-to-right traversal
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}
