//! Tree document persistence
//!
//! The persisted artifact wraps the annotated tree with its per-level counts.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::error_ext::PathResultExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DomainError, QuestionNode};

/// Persisted result of one `ask` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    pub question: String,
    pub max_depth: usize,
    pub generated_at: DateTime<Utc>,
    /// False when the partial build policy left nodes unexpanded
    pub complete: bool,
    pub level_counts: BTreeMap<usize, usize>,
    pub tree: QuestionNode,
}

impl TreeDocument {
    pub fn new(tree: QuestionNode, max_depth: usize) -> Self {
        Self {
            question: tree.text().to_string(),
            max_depth,
            generated_at: Utc::now(),
            complete: tree.is_complete(),
            level_counts: tree.level_counts(),
            tree,
        }
    }

    pub fn to_json(&self) -> ApplicationResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ApplicationError::OperationFailed {
            context: "serialize tree document".to_string(),
            source: Box::new(e),
        })
    }

    /// Parse a document and check that its header agrees with its tree.
    pub fn from_json(json: &str) -> ApplicationResult<Self> {
        let doc: Self = serde_json::from_str(json).map_err(|e| ApplicationError::OperationFailed {
            context: "parse tree document".to_string(),
            source: Box::new(e),
        })?;
        doc.validate()?;
        Ok(doc)
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.tree.level() != 0 {
            return Err(DomainError::InvalidTree(format!(
                "root has level {}",
                self.tree.level()
            )));
        }
        if self.question != self.tree.text() {
            return Err(DomainError::InvalidTree(
                "question does not match the root node".to_string(),
            ));
        }
        if self.complete != self.tree.is_complete() {
            return Err(DomainError::InvalidTree(format!(
                "complete is {} but the tree says {}",
                self.complete,
                self.tree.is_complete()
            )));
        }
        if self.level_counts != self.tree.level_counts() {
            return Err(DomainError::InvalidTree(
                "level_counts do not match the tree".to_string(),
            ));
        }
        if self.tree.depth() > self.max_depth + 1 {
            return Err(DomainError::InvalidTree(format!(
                "tree is deeper than max_depth {}",
                self.max_depth
            )));
        }
        Ok(())
    }

    /// Write the document, replacing `path` atomically.
    #[instrument(level = "debug", skip(self))]
    pub fn save(&self, path: &Path) -> ApplicationResult<()> {
        let json = self.to_json()?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).with_path_context("create directory", dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).with_path_context("create temp file", dir)?;
        tmp.write_all(json.as_bytes())
            .with_path_context("write tree document", path)?;
        tmp.persist(path).with_path_context("persist tree document", path)?;
        debug!(bytes = json.len(), "saved {}", path.display());
        Ok(())
    }

    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> ApplicationResult<Self> {
        let json = std::fs::read_to_string(path).with_path_context("read tree document", path)?;
        Self::from_json(&json)
    }
}
