mod common;

use std::sync::Arc;

use serde_json::{json, Value};
use structa_agent::extract::{extract_local, LocalOutcome, ResponseExtractor};
use structa_agent::{
    Agent, AgentDecision, ExtractError, FunctionTool, ParameterSpec, SchemaRegistry, Tool,
    TurnOutcome, TypeTag,
};
use structa_core::types::{Message, Role};
use structa_providers::CompletionConfig;

use common::{finish, ScriptedProvider};

fn f_tool() -> Arc<dyn Tool> {
    Arc::new(
        FunctionTool::new("f", "Add b to a.", |args| {
            let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
            let b = args.get("b").and_then(Value::as_i64).unwrap_or(5);
            Ok(json!(a + b))
        })
        .param(ParameterSpec::required("a", TypeTag::Int))
        .param(ParameterSpec::optional("b", TypeTag::Int, json!(5)))
        .returns(TypeTag::Int),
    )
}

fn call_f(arguments: Value) -> String {
    json!({"thought": "call f", "function": "f", "arguments": arguments}).to_string()
}

fn feedback(message: &Message) -> Value {
    assert_eq!(message.role, Role::User);
    serde_json::from_str(&message.content).unwrap()
}

#[test]
fn registry_counts_required_and_renders_all_parameters() {
    let tool = FunctionTool::new("mix", "Mixed parameters.", |_| Ok(Value::Null))
        .param(ParameterSpec::required("a", TypeTag::Str))
        .param(ParameterSpec::required("b", TypeTag::list(TypeTag::Int)))
        .param(ParameterSpec::optional("c", TypeTag::Bool, json!(false)))
        .param(ParameterSpec::optional("d", TypeTag::literal(["x", "y"]), json!("x")))
        .param(ParameterSpec::optional("e", TypeTag::dict(TypeTag::Str, TypeTag::Any), json!({})));
    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(tool)];
    let registry = SchemaRegistry::from_tools(&tools);
    let schema = registry.get("mix").unwrap();

    assert_eq!(schema.required_parameters().count(), 2);
    let signature = schema.signature();
    for name in ["a: ", "b: ", "c: ", "d: ", "e: "] {
        assert_eq!(signature.matches(name).count(), 1, "{name} in {signature}");
    }
    assert!(signature.ends_with("-> unknown"));
}

#[test]
fn extractor_recovers_bare_fenced_and_embedded_objects() {
    let decision = AgentDecision {
        thought: "need data".into(),
        function: "f".into(),
        arguments: json!({"a": 1, "note": "{ not a brace }"})
            .as_object()
            .cloned()
            .unwrap(),
    };
    let bare = decision.to_json_string();
    let fenced = format!("Here you go:\n```json\n{bare}\n```");
    let embedded = format!("Let me think. {bare} That is my call.");

    for raw in [bare.as_str(), fenced.as_str(), embedded.as_str()] {
        match extract_local(raw) {
            LocalOutcome::Decision(found) => assert_eq!(found, decision),
            LocalOutcome::Failed(problem) => panic!("failed on {raw:?}: {problem:?}"),
        }
    }
}

#[tokio::test]
async fn unbalanced_text_yields_malformed_response() {
    let unbalanced = r#"{"thought": "x", "function": "f", "arguments": {"a": 1}"#;
    let provider = ScriptedProvider::new(&[unbalanced]);
    let extractor = ResponseExtractor::new(
        provider.clone(),
        "mock",
        CompletionConfig::default(),
        "fix it",
        "{format}",
    );

    for _ in 0..2 {
        match extractor.extract(unbalanced, "question").await {
            Err(ExtractError::Malformed(err)) => {
                assert_eq!(err.expected_format, "{format}");
                assert_eq!(err.to_payload()["error"], "MALFORMED RESPONSE");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    // one fixer call per extraction, never more
    assert_eq!(provider.request_count(), 2);

    let fixer_request = &provider.requests.lock().unwrap()[0];
    assert_eq!(fixer_request[0], Message::system("fix it"));
    assert_eq!(
        fixer_request[1].content,
        format!("Original query from human:\nquestion\nFix the following LLM message:\n{unbalanced}")
    );
}

#[tokio::test]
async fn fixer_pass_recovers_prose_answer() {
    let fixed = finish("Paris");
    let provider = ScriptedProvider::new(&["The capital is Paris.", &fixed]);
    let mut agent = Agent::builder(provider.clone(), "mock").build();

    let outcome = agent.add_user_message("Capital of France?").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Answer(json!("Paris")));
    assert_eq!(provider.request_count(), 2);
    // the stored assistant message is the recovered decision, not the prose
    let stored: Value = serde_json::from_str(&agent.previous_messages()[1].content).unwrap();
    assert_eq!(stored["function"], "finish_conversation");
}

#[tokio::test]
async fn validator_accepts_and_rejects_per_schema() {
    let provider = ScriptedProvider::new(&[
        &call_f(json!({"a": 1})),
        &call_f(json!({})),
        &call_f(json!({"a": 1, "c": 2})),
        &finish("done"),
    ]);
    let mut agent = Agent::builder(provider, "mock").tool(f_tool()).build();
    agent.add_user_message("run f").await.unwrap();

    let history = agent.previous_messages();
    let ok = feedback(&history[2]);
    assert_eq!(ok["type"], "function_call_ok");
    assert_eq!(ok["result"], 6);

    let missing = feedback(&history[4]);
    assert_eq!(missing["type"], "function_call_error");
    assert_eq!(missing["error"]["error"], "INVALID ARGUMENTS");
    assert_eq!(missing["error"]["details"]["missing_arguments"], json!(["a"]));

    let extra = feedback(&history[6]);
    assert_eq!(extra["error"]["details"]["invalid_arguments"], json!(["c"]));
    assert!(extra["error"]["details"].get("missing_arguments").is_none());
    assert_eq!(extra["error"]["correct_function_schema"]["name"], "f");
}

#[tokio::test]
async fn termination_tool_returns_after_one_iteration() {
    let provider = ScriptedProvider::new(&[&finish("42")]);
    let mut agent = Agent::builder(provider.clone(), "mock").build();

    let outcome = agent.add_user_message("answer?").await.unwrap();
    assert_eq!(outcome.answer_text().as_deref(), Some("42"));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn final_answer_comes_from_tool_argument_not_thought() {
    let raw = json!({
        "thought": "The answer is probably 41.",
        "function": "finish_conversation",
        "arguments": {"final_answer": "42"},
    })
    .to_string();
    let provider = ScriptedProvider::new(&[&raw]);
    let mut agent = Agent::builder(provider, "mock").build();

    let outcome = agent.add_user_message("answer?").await.unwrap();
    assert_eq!(outcome, TurnOutcome::Answer(json!("42")));
}

#[tokio::test]
async fn structured_final_answers_end_the_turn() {
    for answer in [json!(42), json!({"city": "Paris", "population_m": 2.1})] {
        let raw = json!({
            "thought": "done",
            "function": "finish_conversation",
            "arguments": {"final_answer": answer.clone()},
        })
        .to_string();
        let provider = ScriptedProvider::new(&[&raw]);
        let mut agent = Agent::builder(provider.clone(), "mock").max_iterations(2).build();

        let outcome = agent.add_user_message("answer?").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Answer(answer));
        assert_eq!(provider.request_count(), 1);
    }
}

#[tokio::test]
async fn budget_exhaustion_returns_no_result() {
    let provider = ScriptedProvider::new(&[&call_f(json!({"a": 1}))]);
    let mut agent = Agent::builder(provider.clone(), "mock")
        .tool(f_tool())
        .max_iterations(4)
        .build();

    let outcome = agent.add_user_message("loop forever").await.unwrap();
    assert_eq!(outcome, TurnOutcome::NoResult);
    assert_eq!(outcome.answer_text(), None);
    assert_eq!(provider.request_count(), 4);
    // user + 4 × (assistant, feedback), all kept for inspection
    assert_eq!(agent.previous_messages().len(), 9);
}

#[tokio::test]
async fn format_error_is_recorded_before_the_next_request() {
    let malformed = "I refuse to use JSON {";
    let provider = ScriptedProvider::new(&[malformed, "still no json {", &finish("ok")]);
    let mut agent = Agent::builder(provider.clone(), "mock").build();
    agent.add_user_message("hello").await.unwrap();

    let requests = provider.requests.lock().unwrap();
    // request 0: main, request 1: fixer, request 2: main again
    assert_eq!(requests.len(), 3);
    let second_main = &requests[2];
    let tail = &second_main[second_main.len() - 3..];
    assert_eq!(tail[0], Message::user("hello"));
    assert_eq!(tail[1], Message::assistant(malformed));
    let error = feedback(&tail[2]);
    assert_eq!(error["type"], "format_error");
    assert_eq!(error["details"], "Assistant response is unparseable.");
    assert_eq!(error["original_user_message"], "hello");
    assert_eq!(error["error"]["required_action"], "Reformat your entire response to match the expected_format");
}

#[tokio::test]
async fn tool_failures_are_fed_back_and_the_loop_continues() {
    let flaky: Arc<dyn Tool> = Arc::new(FunctionTool::new("flaky", "Always panics.", |_| -> anyhow::Result<Value> {
        panic!("disk on fire")
    }));
    let lookup: Arc<dyn Tool> = Arc::new(
        FunctionTool::new_async("lookup", "Async lookup.", |args| async move {
            tokio::task::yield_now().await;
            Ok(json!(format!("found {}", args["key"].as_str().unwrap_or("?"))))
        })
        .param(ParameterSpec::required("key", TypeTag::Str)),
    );

    let provider = ScriptedProvider::new(&[
        r#"{"thought": "try", "function": "flaky", "arguments": {}}"#,
        r#"{"thought": "look", "function": "lookup", "arguments": {"key": "k1"}}"#,
        &finish("found k1"),
    ]);
    let mut agent = Agent::builder(provider, "mock")
        .tools([flaky, lookup])
        .build();

    let outcome = agent.add_user_message("go").await.unwrap();
    assert!(outcome.is_answer());

    let history = agent.previous_messages();
    let failure = feedback(&history[2]);
    assert_eq!(failure["error"]["error"], "EXECUTION FAILED");
    assert!(failure["error"]["details"].as_str().unwrap().contains("disk on fire"));

    let success = feedback(&history[4]);
    assert_eq!(success["result"], "found k1");
}

#[tokio::test]
async fn history_round_trips_into_a_fresh_agent() {
    let provider = ScriptedProvider::new(&[&finish("first")]);
    let mut agent = Agent::builder(provider.clone(), "mock").build();
    agent.add_user_message("one").await.unwrap();
    let saved = agent.into_previous_messages();

    let encoded = serde_json::to_string(&saved).unwrap();
    let decoded: Vec<Message> = serde_json::from_str(&encoded).unwrap();

    let mut next = Agent::builder(provider, "mock")
        .previous_messages(decoded)
        .build();
    next.add_user_message("two").await.unwrap();
    assert_eq!(next.previous_messages()[..3], saved[..]);
    assert_eq!(next.previous_messages()[3], Message::user("two"));
}
