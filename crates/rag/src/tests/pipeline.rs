//! End-to-end pipeline scenarios against a scripted model and fake retriever.
//!
//! The scripted client echoes any prompt no rule matches, so the final answer
//! of these runs is the generation prompt itself.

use super::{record, CountingStage, FakeRetriever, SlowStage, StalledClient};
use crate::orchestrator::Rag;
use crate::transform::{TransformerRegistry, HYDE, MULTI_STEP, RERANK};
use futures::StreamExt;
use ragoon_core::config::{RagSettings, TimeoutSettings};
use ragoon_core::AppError;
use ragoon_llm::{ChatMessage, ScriptedClient};
use std::sync::Arc;
use std::time::Duration;

const HANOI: &str = "Where should I eat in Hanoi?";

const DECOMPOSITION: &str = "Here are the sub-queries:\n1. What dishes is Hanoi known for?\n2. Which streets have the best food stalls?";

fn hanoi_client() -> Arc<ScriptedClient> {
    Arc::new(
        ScriptedClient::new()
            .when("exactly one word", "False")
            .when("break down", DECOMPOSITION)
            .when("dishes is Hanoi", "Hanoi dishes passage: pho and bun cha.")
            .when("food stalls", "Street stall passage: Ta Hien and Hang Buom."),
    )
}

fn hanoi_retriever() -> Arc<FakeRetriever> {
    Arc::new(
        FakeRetriever::new()
            .when(
                "Hanoi dishes",
                vec![
                    record("Pho Thin", "Pho Thin serves beef pho on Lo Duc."),
                    record("Bun Cha Huong Lien", "Bun cha with grilled pork."),
                    record("Cha Ca La Vong", "Turmeric fish with dill."),
                    record("Banh Mi 25", "Banh mi near Hoan Kiem lake."),
                    record("Xoi Yen", "Sticky rice with toppings."),
                    record("Cafe Giang", "Egg coffee since 1946."),
                ],
            )
            .when(
                "Street stall",
                vec![
                    record("Ta Hien", "Beer street with grilled snacks."),
                    record("Hang Buom", "Night food market stalls."),
                ],
            ),
    )
}

fn rag(client: Arc<ScriptedClient>, retriever: Arc<FakeRetriever>) -> Rag {
    Rag::builder(client, retriever).build().unwrap()
}

#[tokio::test]
async fn test_hanoi_runs_full_chain() {
    let client = hanoi_client();
    let retriever = hanoi_retriever();
    let answer = rag(client.clone(), retriever.clone()).answer(HANOI, None).await;

    assert!(!answer.failed, "{}", answer.text);
    assert!(!answer.basic);

    // MultiStep produced two sub-queries, HyDE rewrote each into a passage
    assert_eq!(client.count_matching("break down"), 1);
    assert_eq!(client.count_matching("travel guide"), 2);
    assert_eq!(answer.units.len(), 2);

    let calls = retriever.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.limit == 4));
    assert!(calls
        .iter()
        .all(|c| c.columns == vec!["NAME".to_string(), "INFORMATION".to_string()]));

    // Four of six dish snippets survive truncation, plus both stall snippets
    assert_eq!(answer.contexts.len(), 6);
    assert!(!answer.contexts.contains(&"Sticky rice with toppings.".to_string()));
    assert!(answer.text.contains("Pho Thin serves beef pho on Lo Duc."));
    assert!(answer.text.contains("Night food market stalls."));
    assert!(answer.text.ends_with(&format!("Question:\n{}", HANOI)));
}

#[tokio::test]
async fn test_contexts_follow_unit_order() {
    let retriever = hanoi_retriever();
    let answer = rag(hanoi_client(), retriever.clone()).answer(HANOI, None).await;

    let calls = retriever.calls();
    let first_query = &calls[0].query;
    let first_snippet = &answer.contexts[0];
    if first_query.contains("Hanoi dishes") {
        assert_eq!(first_snippet, "Pho Thin serves beef pho on Lo Duc.");
    } else {
        assert_eq!(first_snippet, "Beer street with grilled snacks.");
    }
    assert_eq!(answer.units[0][0], *first_query);
}

#[tokio::test]
async fn test_basic_query_skips_every_stage() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "True"));
    let retriever = Arc::new(FakeRetriever::new());
    let stage = Arc::new(CountingStage::default());
    let registry = TransformerRegistry::new()
        .with(HYDE, stage.clone())
        .with(MULTI_STEP, stage.clone())
        .with(RERANK, stage.clone());

    let rag = Rag::builder(client.clone(), retriever.clone())
        .registry(registry)
        .build()
        .unwrap();
    let answer = rag.answer("What is 2+2?", None).await;

    assert!(answer.basic);
    assert_eq!(stage.calls(), 0);
    assert_eq!(answer.units, vec![vec!["What is 2+2?".to_string()]]);

    let calls = retriever.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query, "What is 2+2?");

    // Controller plus generation, nothing else
    assert_eq!(client.requests().len(), 2);
}

#[tokio::test]
async fn test_stages_run_in_configured_order_when_not_basic() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "False"));
    let stage = Arc::new(CountingStage::default());
    let registry = TransformerRegistry::new()
        .with(HYDE, stage.clone())
        .with(MULTI_STEP, stage.clone())
        .with(RERANK, stage.clone());

    let rag = Rag::builder(client, Arc::new(FakeRetriever::new()))
        .registry(registry)
        .build()
        .unwrap();
    assert_eq!(rag.stage_keys(), vec![MULTI_STEP, RERANK, HYDE]);

    rag.complete("Plan three days in Hue", None).await;
    assert_eq!(stage.calls(), 3);
}

#[tokio::test]
async fn test_empty_retrieval_uses_none_placeholder() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "True"));
    let text = rag(client, Arc::new(FakeRetriever::new()))
        .complete("Is Sapa cold in December?", None)
        .await;

    assert!(!text.starts_with("Error:"));
    assert!(text.contains("Context:\nNone\n"));
}

#[tokio::test]
async fn test_retrieval_failure_degrades_to_empty_context() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "True"));
    let answer = rag(client, Arc::new(FakeRetriever::failing("service unavailable")))
        .answer("Is Sapa cold in December?", None)
        .await;

    assert!(!answer.failed);
    assert!(answer.contexts.is_empty());
    assert!(answer.text.contains("Context:\nNone\n"));
}

#[tokio::test]
async fn test_generation_failure_becomes_error_text() {
    let client = Arc::new(
        ScriptedClient::new()
            .when("exactly one word", "True")
            .failing_when("tourism and travel", "model overloaded"),
    );
    let answer = rag(client, Arc::new(FakeRetriever::new()))
        .answer("Best beaches near Nha Trang?", None)
        .await;

    assert!(answer.failed);
    assert_eq!(answer.text, "Error: model overloaded");
}

#[tokio::test]
async fn test_controller_protocol_error_aborts_before_stages() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "Perhaps"));
    let retriever = Arc::new(FakeRetriever::new());
    let text = rag(client.clone(), retriever.clone())
        .complete(HANOI, None)
        .await;

    assert!(text.starts_with("Error: controller replied"));
    assert_eq!(client.requests().len(), 1);
    assert!(retriever.calls().is_empty());
}

#[tokio::test]
async fn test_stage_failure_becomes_error_text() {
    let client = Arc::new(
        ScriptedClient::new()
            .when("exactly one word", "False")
            .failing_when("break down", "quota exceeded"),
    );
    let text = rag(client, Arc::new(FakeRetriever::new()))
        .complete(HANOI, None)
        .await;

    assert!(text.starts_with("Error: Decomposition failed"));
    assert!(text.contains("quota exceeded"));
}

#[tokio::test]
async fn test_empty_prompt_is_error_text() {
    let client = Arc::new(ScriptedClient::new());
    let text = rag(client.clone(), Arc::new(FakeRetriever::new()))
        .complete("   ", None)
        .await;

    assert_eq!(text, "Error: prompt is empty");
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_flat_list_prompt_answers_first_string() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "True"));
    let text = rag(client.clone(), Arc::new(FakeRetriever::new()))
        .complete(
            vec!["Hoi An lantern festival".to_string(), "dates".to_string()],
            None,
        )
        .await;

    assert!(text.ends_with("Question:\nHoi An lantern festival"));
    assert!(client.prompts()[0].contains("Hoi An lantern festival"));
}

#[test]
fn test_unknown_stage_key_fails_build() {
    let settings = RagSettings {
        stages: vec![MULTI_STEP.to_string(), "Summarize".to_string()],
        ..RagSettings::default()
    };
    let result = Rag::builder(Arc::new(ScriptedClient::new()), Arc::new(FakeRetriever::new()))
        .settings(settings)
        .build();

    assert!(matches!(result.err(), Some(AppError::Config(_))));
}

#[tokio::test]
async fn test_duplicate_sources_are_deduplicated() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "True"));
    let retriever = Arc::new(FakeRetriever::new().when(
        "Da Lat",
        vec![
            record("Crazy House", "Whimsical guesthouse."),
            record("Crazy House", "Designed by Dang Viet Nga."),
            record("Xuan Huong Lake", "Lake in the city centre."),
        ],
    ));
    let answer = rag(client, retriever).answer("Sights in Da Lat", None).await;

    assert_eq!(
        answer.contexts,
        vec!["Whimsical guesthouse.", "Lake in the city centre."]
    );
}

#[tokio::test]
async fn test_chat_threads_history() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "True"));
    let rag = rag(client.clone(), Arc::new(FakeRetriever::new()));

    let first = rag.chat("Is Hue worth a visit?", Vec::new()).await;
    assert_eq!(first.updated_history.len(), 2);
    assert_eq!(
        first.updated_history[0],
        ChatMessage::user("Is Hue worth a visit?")
    );
    assert!(!client.prompts()[1].contains("Conversation so far"));

    let second = rag
        .chat("How do I get there from Hanoi?", first.updated_history)
        .await;
    assert_eq!(second.updated_history.len(), 4);

    let generation_prompt = client.prompts().last().cloned().unwrap();
    assert!(generation_prompt.contains("Conversation so far"));
    assert!(generation_prompt.contains("user: Is Hue worth a visit?"));
    assert!(generation_prompt.ends_with("Question:\nHow do I get there from Hanoi?"));
}

#[tokio::test]
async fn test_stream_reassembles_answer() {
    let client = Arc::new(
        ScriptedClient::new()
            .when("exactly one word", "True")
            .when("tourism and travel", "Try pho."),
    );
    let chunks: Vec<_> = rag(client, Arc::new(FakeRetriever::new()))
        .stream_complete("Where should I eat?", None)
        .await
        .collect()
        .await;

    assert_eq!(chunks.len(), "Try pho.".len());
    assert!(chunks.iter().all(|c| !c.failed));
    assert_eq!(chunks[0].delta, "T");
    assert_eq!(chunks.last().unwrap().text, "Try pho.");
}

#[tokio::test]
async fn test_stream_failure_yields_single_flagged_chunk() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "Unsure"));
    let chunks: Vec<_> = rag(client, Arc::new(FakeRetriever::new()))
        .stream_complete(HANOI, None)
        .await
        .collect()
        .await;

    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].failed);
    assert!(chunks[0].text.starts_with("Error: "));
}

#[tokio::test]
async fn test_answer_envelope() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "True"));
    let rag = Rag::builder(client, Arc::new(FakeRetriever::new()))
        .model("test-model", 64)
        .build()
        .unwrap();
    let answer = rag.answer("Visa rules for Vietnam", None).await;

    assert_eq!(answer.model, "test-model");
    assert_eq!(answer.question, "Visa rules for Vietnam");
    assert!(!answer.request_id.is_empty());

    let json = serde_json::to_value(&answer).unwrap();
    assert!(json.get("requestId").is_some());
    assert!(json.get("timestamp").is_some());
}

fn short_timeouts() -> RagSettings {
    RagSettings {
        timeouts: TimeoutSettings {
            controller_secs: 1,
            stage_secs: 1,
            retrieval_secs: 1,
            generation_secs: 1,
        },
        ..RagSettings::default()
    }
}

#[tokio::test]
async fn test_slow_retrieval_degrades_to_empty_context() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "True"));
    let retriever = Arc::new(
        FakeRetriever::new()
            .when("Sapa", vec![record("Sapa", "Cold and foggy in December.")])
            .slow(Duration::from_secs(3)),
    );
    let rag = Rag::builder(client, retriever.clone())
        .settings(short_timeouts())
        .build()
        .unwrap();

    let answer = rag.answer("Is Sapa cold in December?", None).await;

    assert!(!answer.failed);
    assert!(answer.contexts.is_empty());
    assert!(answer.text.contains("Context:\nNone\n"));
    assert_eq!(retriever.calls().len(), 1);
}

#[tokio::test]
async fn test_slow_stage_becomes_error_text() {
    let client = Arc::new(ScriptedClient::new().when("exactly one word", "False"));
    let retriever = Arc::new(FakeRetriever::new());
    let slow = Arc::new(SlowStage(Duration::from_secs(3)));
    let registry = TransformerRegistry::new()
        .with(MULTI_STEP, slow.clone())
        .with(RERANK, slow.clone())
        .with(HYDE, slow);

    let answer = Rag::builder(client, retriever.clone())
        .registry(registry)
        .settings(short_timeouts())
        .build()
        .unwrap()
        .answer(HANOI, None)
        .await;

    assert!(answer.failed);
    assert_eq!(answer.text, "Error: slow timed out after 1s");
    assert!(retriever.calls().is_empty());
}

#[tokio::test]
async fn test_stalled_controller_times_out() {
    let rag = Rag::builder(
        Arc::new(StalledClient(Duration::from_secs(3))),
        Arc::new(FakeRetriever::new()),
    )
    .settings(short_timeouts())
    .build()
    .unwrap();

    let answer = rag.answer(HANOI, None).await;

    assert!(answer.failed);
    assert_eq!(answer.text, "Error: controller timed out after 1s");
}

#[test]
fn test_zero_timeout_fails_build() {
    let mut settings = short_timeouts();
    settings.timeouts.generation_secs = 0;

    let result = Rag::builder(
        Arc::new(ScriptedClient::new()),
        Arc::new(FakeRetriever::new()),
    )
    .settings(settings)
    .build();

    assert!(matches!(result.err(), Some(AppError::Config(_))));
}
