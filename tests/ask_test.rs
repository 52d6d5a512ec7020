//! End-to-end tests for the `ask` use case through the service container.
//!
//! Runs build, resolve and save against scripted collaborators: either a
//! scripted oracle, or the real LLM oracle over a scripted chat transport.
//! Documents are written to a temp directory and read back.

mod common;

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use qtree::application::services::TreeDocument;
use qtree::cli::commands::{run_ask, AskRequest};
use qtree::cli::CliError;
use qtree::exitcode;
use qtree::infrastructure::di::ServiceContainer;

use common::{
    child_text, test_settings, text_reply, verdict_reply, ScriptedChat, ScriptedOracle,
    ScriptedProvider,
};

const QUESTION: &str = "Will the Thunder have the best record in the West?";

fn request(temp: &TempDir, depth: usize) -> AskRequest {
    AskRequest {
        question: QUESTION.to_string(),
        depth: Some(depth),
        output: Some(temp.path().join("tree.json")),
        ..AskRequest::default()
    }
}

#[tokio::test]
async fn given_question_when_asking_then_document_saved_with_counts() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let container =
        ServiceContainer::with_oracle(test_settings(), Arc::new(ScriptedOracle::with_score(0.55)));

    // Act
    let outcome = run_ask(&container, &request(&temp, 2)).await.unwrap();

    // Assert
    let report = outcome.report.unwrap();
    assert_eq!(report.total, 31);
    assert!(report.is_clean());
    let saved = TreeDocument::load(&outcome.output).unwrap();
    assert_eq!(saved, outcome.document);
    assert_eq!(saved.level_counts.values().copied().collect::<Vec<_>>(), vec![1, 5, 25]);
    assert!(saved.tree.iter_bfs().all(|n| n.confidence() == Some(0.55)));
}

#[tokio::test]
async fn given_skip_resolve_when_asking_then_tree_saved_unresolved() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let oracle = Arc::new(ScriptedOracle::new());
    let container = ServiceContainer::with_oracle(test_settings(), oracle.clone());

    // Act
    let outcome = run_ask(
        &container,
        &AskRequest {
            skip_resolve: true,
            ..request(&temp, 1)
        },
    )
    .await
    .unwrap();

    // Assert
    assert!(outcome.report.is_none());
    assert!(oracle.resolve_calls().is_empty());
    assert!(outcome.document.tree.iter_bfs().all(|n| n.answer().is_none()));
}

#[tokio::test]
async fn given_partial_flag_when_child_fails_then_incomplete_document_saved() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let oracle = ScriptedOracle::new().short_decompose_for(&child_text(QUESTION, 5));
    let container = ServiceContainer::with_oracle(test_settings(), Arc::new(oracle));

    // Act
    let outcome = run_ask(
        &container,
        &AskRequest {
            partial: true,
            ..request(&temp, 2)
        },
    )
    .await
    .unwrap();

    // Assert
    assert!(!outcome.document.complete);
    assert_eq!(outcome.document.tree.node_count(), 1 + 5 + 20);
}

#[tokio::test]
async fn given_depth_above_limit_when_asking_then_usage_error_and_nothing_saved() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let container = ServiceContainer::with_oracle(test_settings(), Arc::new(ScriptedOracle::new()));

    // Act
    let err = run_ask(&container, &request(&temp, 5)).await.unwrap_err();

    // Assert
    assert!(matches!(err, CliError::Infra(_)));
    assert_eq!(err.exit_code(), exitcode::USAGE);
    assert!(!temp.path().join("tree.json").exists());
}

#[tokio::test]
async fn given_scripted_transport_when_asking_then_llm_oracle_drives_both_passes() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let subquestions = json!({
        "question_one": "Do they lead the West in wins?",
        "question_two": "Is their net rating first in the West?",
        "question_three": "Is their top scorer healthy?",
        "question_four": "Do they have the easiest remaining schedule?",
        "question_five": "Have they won 10 of their last 12?"
    });
    let mut replies = vec![text_reply(&subquestions.to_string())];
    replies.extend((0..6).map(|i| verdict_reply(&format!("answer {i}"), 0.1 * i as f64)));
    let chat = Arc::new(ScriptedChat::new(replies));
    let container = ServiceContainer::with_transport(
        test_settings(),
        chat.clone(),
        Arc::new(ScriptedProvider::default()),
    );

    // Act
    let outcome = run_ask(
        &container,
        &AskRequest {
            concurrency: Some(1),
            ..request(&temp, 1)
        },
    )
    .await
    .unwrap();

    // Assert
    let tree = &outcome.document.tree;
    assert_eq!(tree.children()[3].text(), "Do they have the easiest remaining schedule?");
    assert_eq!(tree.answer(), Some("answer 0"));
    assert_eq!(tree.children()[4].answer(), Some("answer 5"));
    assert_eq!(chat.requests().len(), 7);
}
