//! # SqlChat Pipeline Tests
//!
//! Drives the three entry points of `SqlChat` with mock AI and storage
//! providers, covering the error taxonomy and concurrent use of one instance.

mod common;

use common::{fenced, setup_tracing};
use datachat::{prompts::sql::EXAMPLE_QUERY, ChatError, SqlChat, SqlChatBuilder};
use datachat_test_utils::{query_result, MockAiProvider, MockStorage};
use serde_json::json;
use std::{sync::Arc, time::Duration};

fn build_chat(ai: &MockAiProvider, storage: &MockStorage) -> SqlChat {
    SqlChatBuilder::new()
        .ai_provider(Box::new(ai.clone()))
        .storage_provider(Box::new(storage.clone()))
        .build()
        .unwrap()
}

#[test]
fn test_builder_requires_both_providers() {
    let err = SqlChatBuilder::new()
        .storage_provider(Box::new(MockStorage::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, ChatError::MissingAiProvider));

    let err = SqlChatBuilder::new()
        .ai_provider(Box::new(MockAiProvider::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, ChatError::MissingStorageProvider));
}

#[tokio::test]
async fn test_generate_sql_returns_question_sql_and_raw_output() {
    setup_tracing();
    let ai = MockAiProvider::new();
    let raw = format!("Here you go:\n{}", fenced("sql", EXAMPLE_QUERY));
    ai.add_response("total spend per vendor", &raw);
    let storage = MockStorage::new();
    let chat = build_chat(&ai, &storage);

    let generation = chat.generate_sql("total spend per vendor").await.unwrap();

    assert_eq!(generation.question, "total spend per vendor");
    assert_eq!(generation.sql, EXAMPLE_QUERY);
    assert_eq!(generation.raw_model_output, raw);
    assert!(storage.get_calls().is_empty());

    let calls = ai.get_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].0.contains("\"Vendor\""));
    assert_eq!(
        calls[0].1,
        "Generate a valid PostgreSQL SQL query for: total spend per vendor"
    );
}

#[tokio::test]
async fn test_generate_sql_with_blank_question_is_invalid_input() {
    setup_tracing();
    let ai = MockAiProvider::new();
    let chat = build_chat(&ai, &MockStorage::new());

    let err = chat.generate_sql("  ").await.unwrap_err();

    assert!(matches!(err, ChatError::InvalidInput(_)));
    assert!(ai.get_calls().is_empty());
}

#[tokio::test]
async fn test_generate_sql_reports_empty_sql_without_failing() {
    setup_tracing();
    let ai = MockAiProvider::new();
    ai.add_response("weather", "I can only answer questions about invoices.");
    let chat = build_chat(&ai, &MockStorage::new());

    let generation = chat.generate_sql("what's the weather?").await.unwrap();

    assert_eq!(generation.sql, "");
    assert_eq!(
        generation.raw_model_output,
        "I can only answer questions about invoices."
    );
}

#[tokio::test]
async fn test_model_failure_is_surfaced() {
    setup_tracing();
    let ai = MockAiProvider::new();
    ai.fail_with("upstream timed out");
    let storage = MockStorage::new();
    let chat = build_chat(&ai, &storage);

    let err = chat.chat_with_data("how many vendors?").await.unwrap_err();

    match err {
        ChatError::ModelInvocation(message) => assert_eq!(message, "upstream timed out"),
        other => panic!("expected ModelInvocation, got {other:?}"),
    }
    assert!(storage.get_calls().is_empty());
}

#[tokio::test]
async fn test_run_sql_with_empty_string_never_reaches_storage() {
    setup_tracing();
    let storage = MockStorage::new();
    let chat = build_chat(&MockAiProvider::new(), &storage);

    for sql in ["", "   \n"] {
        let err = chat.run_sql(sql).await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyQuery));
    }
    assert!(storage.get_calls().is_empty());
}

#[tokio::test]
async fn test_run_sql_returns_data_columns_and_row_count() {
    setup_tracing();
    let storage = MockStorage::new();
    storage.add_result(
        "FROM \"Vendor\"",
        query_result(
            &["id", "name"],
            vec![
                vec![json!("v1"), json!("Acme")],
                vec![json!("v2"), json!("Globex")],
            ],
        ),
    );
    let chat = build_chat(&MockAiProvider::new(), &storage);

    let outcome = chat
        .run_sql("SELECT V.\"id\", V.\"name\" FROM \"Vendor\" V")
        .await
        .unwrap();

    assert_eq!(outcome.columns, vec!["id", "name"]);
    assert_eq!(outcome.row_count, 2);
    assert_eq!(
        serde_json::to_value(&outcome.data).unwrap(),
        json!([{"id": "v1", "name": "Acme"}, {"id": "v2", "name": "Globex"}])
    );
}

#[tokio::test]
async fn test_run_sql_surfaces_database_message() {
    setup_tracing();
    let storage = MockStorage::new();
    storage.add_error("nope", "column \"nope\" does not exist");
    let chat = build_chat(&MockAiProvider::new(), &storage);

    let err = chat.run_sql("SELECT nope FROM \"Vendor\"").await.unwrap_err();

    match err {
        ChatError::Execution(message) => assert_eq!(message, "column \"nope\" does not exist"),
        other => panic!("expected Execution, got {other:?}"),
    }
}

#[tokio::test]
async fn test_chat_with_data_combines_generation_and_result() {
    setup_tracing();
    let ai = MockAiProvider::new();
    let raw = fenced("sql", EXAMPLE_QUERY);
    ai.add_response("total spend per vendor", &raw);
    let storage = MockStorage::new();
    storage.add_result(
        "total_spend",
        query_result(&["name", "total_spend"], vec![vec![json!("Acme"), json!(350.0)]]),
    );
    let chat = build_chat(&ai, &storage);

    let outcome = chat.chat_with_data("total spend per vendor").await.unwrap();

    assert_eq!(outcome.question, "total spend per vendor");
    assert_eq!(outcome.sql, EXAMPLE_QUERY);
    assert_eq!(outcome.raw_model_output, raw);
    assert_eq!(outcome.columns, vec!["name", "total_spend"]);
    assert_eq!(outcome.row_count, 1);
    assert_eq!(outcome.data[0]["total_spend"], json!(350.0));
    assert_eq!(storage.get_calls(), vec![EXAMPLE_QUERY.to_string()]);
}

#[tokio::test]
async fn test_chat_with_data_reports_extraction_empty_with_raw_output() {
    setup_tracing();
    let ai = MockAiProvider::new();
    let raw = "Explanation: there is no table holding employee salaries.";
    ai.add_response("salaries", raw);
    let storage = MockStorage::new();
    let chat = build_chat(&ai, &storage);

    let err = chat.chat_with_data("average salaries").await.unwrap_err();

    match err {
        ChatError::ExtractionEmpty { raw_model_output } => assert_eq!(raw_model_output, raw),
        other => panic!("expected ExtractionEmpty, got {other:?}"),
    }
    assert!(storage.get_calls().is_empty());
}

#[tokio::test]
async fn test_chat_with_data_refusal_naming_a_keyword_never_reaches_storage() {
    setup_tracing();
    let ai = MockAiProvider::new();
    let raw = "Sorry, I can't select refund data: there is no refunds table.";
    ai.add_response("refunds", raw);
    let storage = MockStorage::new();
    storage.add_error("refund", r#"relation "refunds" does not exist"#);
    let chat = build_chat(&ai, &storage);

    let err = chat.chat_with_data("total refunds last year").await.unwrap_err();

    assert!(
        matches!(&err, ChatError::ExtractionEmpty { raw_model_output } if raw_model_output == raw),
        "{err:?}"
    );
    assert!(storage.get_calls().is_empty());
}

#[tokio::test]
async fn test_chat_with_data_surfaces_execution_error() {
    setup_tracing();
    let ai = MockAiProvider::new();
    ai.add_response("ghost", "SELECT I.\"ghost\" FROM \"Invoice\" I;");
    let storage = MockStorage::new();
    storage.add_error("ghost", "column I.ghost does not exist");
    let chat = build_chat(&ai, &storage);

    let err = chat.chat_with_data("ghost column").await.unwrap_err();

    assert!(matches!(err, ChatError::Execution(m) if m == "column I.ghost does not exist"));
}

#[tokio::test]
async fn test_concurrent_chats_do_not_interfere() {
    setup_tracing();
    let ai = MockAiProvider::new().with_delay(Duration::from_millis(20));
    let storage = MockStorage::new().with_delay(Duration::from_millis(20));

    let questions: Vec<(String, String)> = (0..8)
        .map(|i| {
            (
                format!("question number {i}?"),
                format!("SELECT {i} AS answer_{i};"),
            )
        })
        .collect();
    for (i, (question, sql)) in questions.iter().enumerate() {
        ai.add_response(question, &fenced("sql", sql));
        let column = format!("answer_{i}");
        storage.add_result(
            &format!("{column};"),
            query_result(&[column.as_str()], vec![vec![json!(i)]]),
        );
    }

    let chat = Arc::new(build_chat(&ai, &storage));
    let handles: Vec<_> = questions
        .iter()
        .map(|(question, _)| {
            let chat = Arc::clone(&chat);
            let question = question.clone();
            tokio::spawn(async move { chat.chat_with_data(&question).await })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.question, questions[i].0);
        assert_eq!(outcome.sql, questions[i].1);
        assert_eq!(outcome.columns, vec![format!("answer_{i}")]);
        assert_eq!(outcome.data[0][&format!("answer_{i}")], json!(i));
    }
    assert_eq!(storage.get_calls().len(), questions.len());
}
