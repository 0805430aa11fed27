//! Full pipeline scenarios: upload to answer, scoped retrieval after
//! merge and delete, and supersede-on-resubmit

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{assert_index_consistent, stack, stack_with_embedder, wait_settled, HashEmbedder};
use docchat::generation::{PromptBuilder, StreamEvent};
use docchat::types::DocumentStatus;

fn corpus(topic: &str, sentences: usize) -> Vec<u8> {
    (0..sentences)
        .map(|i| format!("Everything about {} is covered in section {}. ", topic, i))
        .collect::<String>()
        .into_bytes()
}

#[tokio::test]
async fn upload_retrieve_and_stream_an_answer() {
    let stack = stack();
    let doc = stack
        .manager
        .add("rust.txt".to_string(), corpus("ownership", 20))
        .await
        .unwrap();
    assert_eq!(wait_settled(&stack.manager, doc.id).await, DocumentStatus::Ready);

    let context = stack
        .planner
        .retrieve("tell me about ownership", &[doc.id])
        .await
        .unwrap();
    assert!(!context.is_empty());
    for chunk in &context.chunks {
        assert_eq!(chunk.document_id, doc.id);
        assert!(chunk.text.contains("ownership"));
    }

    let prompt =
        PromptBuilder::chat_prompt("tell me about ownership", &context.context_text(), &[], 1, 6);
    assert!(prompt.contains("Context:"));
    assert!(prompt.contains("ownership"));

    let stream = stack.streamer.generate(prompt);
    let (text, terminal) = stream.collect_text().await;
    assert!(!text.is_empty());
    assert_eq!(terminal, Some(StreamEvent::Done));
}

#[tokio::test]
async fn merged_document_answers_from_both_sources_after_source_delete() {
    let stack = stack();
    let d1 = stack
        .manager
        .add("volcanoes.txt".to_string(), corpus("volcanoes", 15))
        .await
        .unwrap();
    let d2 = stack
        .manager
        .add("glaciers.txt".to_string(), corpus("glaciers", 15))
        .await
        .unwrap();
    wait_settled(&stack.manager, d1.id).await;
    wait_settled(&stack.manager, d2.id).await;

    let d3 = stack
        .manager
        .merge(&[d1.id, d2.id], "earth.txt".to_string())
        .await
        .unwrap();
    wait_settled(&stack.manager, d3.id).await;

    stack.manager.delete(d1.id).await.unwrap();
    assert_index_consistent(&stack.library, &stack.index).await;

    // The deleted source is out of scope even if the caller still names it
    let gone = stack
        .planner
        .retrieve("volcanoes", &[d1.id])
        .await
        .unwrap();
    assert!(gone.is_empty());

    // The merged document carries content from both sources
    let merged = stack
        .planner
        .retrieve_with("volcanoes glaciers", &[d3.id], 64, 100_000)
        .await
        .unwrap();
    assert!(!merged.is_empty());
    let text = merged.context_text();
    assert!(text.contains("volcanoes"));
    assert!(text.contains("glaciers"));
    for chunk in &merged.chunks {
        assert_eq!(chunk.document_id, d3.id);
    }
}

#[tokio::test]
async fn resubmit_supersedes_an_in_flight_job() {
    // A slow embedder keeps the first job in its embedding loop while the
    // second submission lands
    let stack = stack_with_embedder(Arc::new(HashEmbedder::slow(30)));

    let doc = stack
        .manager
        .add("draft.txt".to_string(), corpus("first", 40))
        .await
        .unwrap();

    // Let the first job get past extraction and start embedding
    tokio::time::sleep(Duration::from_millis(50)).await;

    stack
        .manager
        .resubmit(doc.id, "draft.txt".to_string(), corpus("second", 10))
        .await
        .unwrap();

    assert_eq!(wait_settled(&stack.manager, doc.id).await, DocumentStatus::Ready);

    // Give the superseded job time to finish its rollback
    tokio::time::sleep(Duration::from_millis(300)).await;

    let settled = stack.manager.get(doc.id).unwrap();
    assert!(settled.chunk_count > 0);
    assert_index_consistent(&stack.library, &stack.index).await;

    // The surviving content is the second submission's
    let text = stack.library.text(doc.id).unwrap();
    assert!(text.contains("second"));
    assert!(!text.contains("first"));

    assert!(!stack.pipeline.has_job(doc.id));
}

#[tokio::test]
async fn retrieval_scope_is_per_request() {
    let stack = stack();
    let a = stack
        .manager
        .add("a.txt".to_string(), corpus("alpha", 10))
        .await
        .unwrap();
    let b = stack
        .manager
        .add("b.txt".to_string(), corpus("beta", 10))
        .await
        .unwrap();
    wait_settled(&stack.manager, a.id).await;
    wait_settled(&stack.manager, b.id).await;

    let scoped = stack
        .planner
        .retrieve_with("alpha beta", &[a.id], 64, 100_000)
        .await
        .unwrap();
    assert!(!scoped.is_empty());
    assert!(scoped.chunks.iter().all(|c| c.document_id == a.id));

    let both = stack
        .planner
        .retrieve_with("alpha beta", &[a.id, b.id], 64, 100_000)
        .await
        .unwrap();
    let docs: std::collections::HashSet<_> =
        both.chunks.iter().map(|c| c.document_id).collect();
    assert!(docs.contains(&a.id));
    assert!(docs.contains(&b.id));
}
