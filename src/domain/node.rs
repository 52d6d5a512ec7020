//! Domain entities: question nodes and their resolutions

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Number of subquestions generated per expanded node.
pub const FAN_OUT: usize = 5;

/// Deepest tree any configuration may request.
pub const DEPTH_CEILING: usize = 8;

/// Answer text attached to nodes whose resolution could not complete.
pub const UNRESOLVED_ANSWER: &str = "unresolved";

/// Final structured answer produced by the oracle for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub explanation: String,
    /// Always within [0.0, 1.0]
    pub score: f64,
}

impl Verdict {
    /// Build a verdict, clamping the score into [0.0, 1.0].
    ///
    /// Non-finite scores are rejected rather than clamped.
    pub fn new(explanation: impl Into<String>, score: f64) -> Result<Self, DomainError> {
        let explanation = explanation.into();
        if !score.is_finite() {
            return Err(DomainError::malformed(
                explanation,
                format!("score is not a finite number: {score}"),
            ));
        }
        Ok(Self {
            explanation,
            score: score.clamp(0.0, 1.0),
        })
    }
}

/// How a node's resolution ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Answered,
    /// Sentinel result, distinguishable from a genuine low-confidence answer
    Failed { reason: String },
}

/// Answer and confidence attached to a node by the resolve pass.
///
/// Keeping both in one value makes "answer without confidence" unrepresentable.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub answer: String,
    pub confidence: f64,
    pub outcome: Outcome,
}

impl Resolution {
    pub fn answered(verdict: Verdict) -> Self {
        Self {
            answer: verdict.explanation,
            confidence: verdict.score,
            outcome: Outcome::Answered,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            answer: UNRESOLVED_ANSWER.to_string(),
            confidence: 0.0,
            outcome: Outcome::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

/// A question in the tree. Children are owned exclusively by their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeRecord", into = "NodeRecord")]
pub struct QuestionNode {
    text: String,
    level: usize,
    children: Vec<QuestionNode>,
    resolution: Option<Resolution>,
    /// Set when the partial build policy left this node unexpanded
    expansion_error: Option<String>,
}

impl QuestionNode {
    /// Create the root node (level 0).
    pub fn root(text: &str) -> Result<Self, DomainError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(DomainError::InvalidInput(
                "root question must not be empty".to_string(),
            ));
        }
        Ok(Self::new(text.to_string(), 0))
    }

    fn new(text: String, level: usize) -> Self {
        Self {
            text,
            level,
            children: Vec::new(),
            resolution: None,
            expansion_error: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn children(&self) -> &[QuestionNode] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<QuestionNode> {
        &mut self.children
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    pub fn answer(&self) -> Option<&str> {
        self.resolution.as_ref().map(|r| r.answer.as_str())
    }

    pub fn confidence(&self) -> Option<f64> {
        self.resolution.as_ref().map(|r| r.confidence)
    }

    pub fn expansion_error(&self) -> Option<&str> {
        self.expansion_error.as_deref()
    }

    /// Attach one child per subquestion, in the given order.
    ///
    /// All-or-nothing: an empty subquestion rejects the whole batch.
    pub fn attach_children(&mut self, subquestions: Vec<String>) -> Result<(), DomainError> {
        if let Some(pos) = subquestions.iter().position(|q| q.trim().is_empty()) {
            return Err(DomainError::malformed(
                self.text.clone(),
                format!("subquestion {} is empty", pos + 1),
            ));
        }
        let level = self.level + 1;
        self.children.extend(
            subquestions
                .into_iter()
                .map(|q| QuestionNode::new(q.trim().to_string(), level)),
        );
        Ok(())
    }

    /// Replace any previous resolution.
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = Some(resolution);
    }

    pub fn mark_partial(&mut self, reason: impl Into<String>) {
        self.expansion_error = Some(reason.into());
    }

    /// True when no node in the tree was left unexpanded by a build failure.
    pub fn is_complete(&self) -> bool {
        self.iter_bfs().all(|n| n.expansion_error.is_none())
    }
}

/// Total node count of a fully built tree of the given depth.
///
/// Saturates at `usize::MAX` instead of overflowing.
pub fn expected_node_count(max_depth: usize) -> usize {
    nodes_above(max_depth.saturating_add(1))
}

/// Number of decompose calls needed to build a tree of the given depth.
pub fn expected_decompose_calls(max_depth: usize) -> usize {
    nodes_above(max_depth)
}

fn nodes_above(level: usize) -> usize {
    (0..level)
        .map(|l| FAN_OUT.saturating_pow(u32::try_from(l).unwrap_or(u32::MAX)))
        .fold(0, usize::saturating_add)
}

/// Persisted shape of a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRecord {
    text: String,
    level: usize,
    #[serde(default)]
    children: Vec<NodeRecord>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default, alias = "confidence")]
    probability_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expansion_error: Option<String>,
}

impl From<QuestionNode> for NodeRecord {
    fn from(node: QuestionNode) -> Self {
        let (answer, probability_score, failure) = match node.resolution {
            Some(r) => {
                let failure = match r.outcome {
                    Outcome::Answered => None,
                    Outcome::Failed { reason } => Some(reason),
                };
                (Some(r.answer), Some(r.confidence), failure)
            }
            None => (None, None, None),
        };
        Self {
            text: node.text,
            level: node.level,
            children: node.children.into_iter().map(NodeRecord::from).collect(),
            answer,
            probability_score,
            failure,
            expansion_error: node.expansion_error,
        }
    }
}

impl TryFrom<NodeRecord> for QuestionNode {
    type Error = DomainError;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        if record.text.trim().is_empty() {
            return Err(DomainError::InvalidTree(format!(
                "empty question text at level {}",
                record.level
            )));
        }
        let resolution = match (record.answer, record.probability_score) {
            (Some(answer), Some(score)) => {
                if !(0.0..=1.0).contains(&score) {
                    return Err(DomainError::InvalidTree(format!(
                        "probability_score {score} outside [0, 1] for '{}'",
                        record.text
                    )));
                }
                Some(Resolution {
                    answer,
                    confidence: score,
                    outcome: match record.failure {
                        Some(reason) => Outcome::Failed { reason },
                        None => Outcome::Answered,
                    },
                })
            }
            (None, None) => None,
            _ => {
                return Err(DomainError::InvalidTree(format!(
                    "answer and probability_score must be set together for '{}'",
                    record.text
                )))
            }
        };

        let level = record.level;
        let children = record
            .children
            .into_iter()
            .map(QuestionNode::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(child) = children.iter().find(|c| c.level != level + 1) {
            return Err(DomainError::InvalidTree(format!(
                "child '{}' has level {}, expected {}",
                child.text,
                child.level,
                level + 1
            )));
        }

        Ok(Self {
            text: record.text,
            level,
            children,
            resolution,
            expansion_error: record.expansion_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five(prefix: &str) -> Vec<String> {
        (1..=FAN_OUT).map(|i| format!("{prefix} {i}?")).collect()
    }

    #[test]
    fn given_blank_text_when_creating_root_then_invalid_input() {
        assert!(matches!(
            QuestionNode::root("   "),
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn given_subquestions_when_attaching_then_levels_increment() {
        let mut root = QuestionNode::root("Will the Heat win?").unwrap();
        root.attach_children(five("sub")).unwrap();

        assert_eq!(root.children().len(), FAN_OUT);
        assert!(root.children().iter().all(|c| c.level() == 1));
        assert_eq!(root.children()[2].text(), "sub 3?");
    }

    #[test]
    fn given_empty_subquestion_when_attaching_then_nothing_attached() {
        let mut root = QuestionNode::root("q").unwrap();
        let mut subs = five("sub");
        subs[1] = " ".to_string();

        let err = root.attach_children(subs).unwrap_err();

        assert!(matches!(err, DomainError::MalformedOracleOutput { .. }));
        assert!(root.children().is_empty());
    }

    #[test]
    fn given_out_of_range_scores_when_building_verdict_then_clamped() {
        assert_eq!(Verdict::new("x", 1.4).unwrap().score, 1.0);
        assert_eq!(Verdict::new("x", -0.2).unwrap().score, 0.0);
        assert_eq!(Verdict::new("x", 0.37).unwrap().score, 0.37);
        assert!(Verdict::new("x", f64::NAN).is_err());
    }

    #[test]
    fn given_sentinel_when_inspecting_then_distinguishable_from_low_confidence() {
        let failed = Resolution::failed("timeout");
        let low = Resolution::answered(Verdict::new("unlikely", 0.0).unwrap());

        assert!(failed.is_failure());
        assert!(!low.is_failure());
        assert_eq!(failed.answer, UNRESOLVED_ANSWER);
        assert_eq!(failed.confidence, low.confidence);
    }

    #[test]
    fn test_expected_counts() {
        assert_eq!(
            (0..=3).map(expected_node_count).collect::<Vec<_>>(),
            vec![1, 6, 31, 156]
        );
        assert_eq!(
            (0..=3).map(expected_decompose_calls).collect::<Vec<_>>(),
            vec![0, 1, 6, 31]
        );
    }

    #[test]
    fn given_huge_depth_when_counting_then_saturates() {
        assert_eq!(expected_node_count(28), usize::MAX);
        assert_eq!(expected_decompose_calls(40), usize::MAX);
        assert_eq!(expected_node_count(DEPTH_CEILING), 488_281);
    }

    #[test]
    fn given_answer_without_score_when_deserializing_then_rejected() {
        let json = r#"{"text":"q","level":0,"children":[],"answer":"yes","probability_score":null}"#;
        let err = serde_json::from_str::<QuestionNode>(json).unwrap_err();
        assert!(err.to_string().contains("set together"));
    }

    #[test]
    fn given_wrong_child_level_when_deserializing_then_rejected() {
        let json = r#"{"text":"q","level":0,"children":[{"text":"c","level":2}]}"#;
        assert!(serde_json::from_str::<QuestionNode>(json).is_err());
    }

    #[test]
    fn given_confidence_alias_when_deserializing_then_accepted() {
        let json = r#"{"text":"q","level":0,"answer":"a","confidence":0.5}"#;
        let node: QuestionNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.confidence(), Some(0.5));
        assert_eq!(node.answer(), Some("a"));
    }
}
