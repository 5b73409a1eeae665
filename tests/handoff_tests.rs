//! Handoff behavior observed through full runs.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use baton::agent::{Agent, AgentSet};
use baton::agent_loop::Runner;
use baton::error::BatonError;
use baton::handoff::{validate_payload, Handoff, HandoffContext, HandoffPayload};
use baton::provider::ModelResponse;
use baton::tools::{FunctionTool, ToolParameters};
use baton::types::Usage;
use common::{final_turn, handoff_turn, scripted};
use pretty_assertions::assert_eq;
use serde_json::{json, Map};

fn counting_tool(name: &str, calls: Arc<AtomicUsize>) -> FunctionTool {
    FunctionTool::new(name, "Counts invocations", ToolParameters::empty(), move |_args, _ctx| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!("looked up"))
        }
    })
}

#[tokio::test]
async fn first_handoff_in_a_turn_wins() {
    let lookups = Arc::new(AtomicUsize::new(0));
    let provider = scripted([
        ModelResponse::new(Usage::new(1, 1))
            .function_call("lookup", "{}", "c1")
            .function_call("transfer_to_billing", "{}", "c2")
            .function_call("transfer_to_support", "{}", "c3"),
        final_turn("billing here", Usage::new(1, 1)),
    ]);
    let agents = AgentSet::new(
        Agent::new("Triage")
            .with_tool(counting_tool("lookup", lookups.clone()))
            .with_handoff("Billing")
            .with_handoff("Support"),
    )
    .with_agent(Agent::new("Billing"))
    .with_agent(Agent::new("Support"));

    let result = Runner::new(provider).run(&agents, "refund please").await.unwrap();

    assert_eq!(result.last_agent, "Billing");
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
    assert_eq!(result.context.handoff_chain().len(), 1);
    assert_eq!(result.tool_use["Triage"], vec!["transfer_to_billing"]);

    let first = &result.steps[0];
    assert_eq!(first.tool_results.len(), 1);
    let recorded_calls = &first.new_step_items[0].tool_calls;
    assert_eq!(recorded_calls.len(), 1);
    assert_eq!(recorded_calls[0].id, "c2");
}

#[tokio::test]
async fn hook_failure_aborts_the_run() {
    let provider = scripted([
        handoff_turn("transfer_to_billing", "c1", Usage::new(1, 1)),
        final_turn("unreachable", Usage::new(1, 1)),
    ]);
    let handoff = Handoff::new("Billing").with_on_handoff(|_payload| {
        Err(BatonError::Configuration("billing desk closed".into()))
    });
    let agents = AgentSet::new(Agent::new("Triage").with_handoff(handoff))
        .with_agent(Agent::new("Billing"));

    let err = Runner::new(provider.clone()).run(&agents, "refund").await.unwrap_err();

    match err {
        BatonError::HandoffHook { from, to, message } => {
            assert_eq!(from, "Triage");
            assert_eq!(to, "Billing");
            assert!(message.contains("billing desk closed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn hook_sees_the_filtered_payload() {
    let seen: Arc<Mutex<Vec<HandoffPayload>>> = Arc::default();
    let sink = seen.clone();
    let handoff = Handoff::new("Billing")
        .with_input_filter(|mut payload| {
            payload.data.remove("card_number");
            payload
                .data
                .insert("screened".into(), json!(true));
            payload
        })
        .with_on_handoff(move |payload| {
            sink.lock().unwrap().push(payload.clone());
            Ok(())
        });
    let provider = scripted([
        ModelResponse::new(Usage::new(1, 1)).function_call(
            "transfer_to_billing",
            r#"{"data": {"order": "A-17", "card_number": "4111"}, "reason": "refund"}"#,
            "c1",
        ),
        final_turn("refunded", Usage::new(1, 1)),
    ]);
    let agents = AgentSet::new(Agent::new("Triage").with_handoff(handoff))
        .with_agent(Agent::new("Billing"));

    let result = Runner::new(provider).run(&agents, "refund A-17").await.unwrap();

    let shared = result.context.shared_context();
    assert_eq!(shared.get("order"), Some(&json!("A-17")));
    assert_eq!(shared.get("screened"), Some(&json!(true)));
    assert!(shared.get("card_number").is_none());

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].reason.as_deref(), Some("refund"));
    assert!(!seen[0].data.contains_key("card_number"));
}

#[tokio::test]
async fn data_contract_shapes_the_tool_but_is_not_enforced() {
    let contract = json!({
        "type": "object",
        "properties": { "order_id": { "type": "string" } },
        "required": ["order_id"]
    });
    let handoff = Handoff::new("Billing").with_data_contract(contract.clone());
    let provider = scripted([
        ModelResponse::new(Usage::new(1, 1)).function_call("transfer_to_billing", r#"{"note": "no id"}"#, "c1"),
        final_turn("which order?", Usage::new(1, 1)),
    ]);
    let agents = AgentSet::new(Agent::new("Triage").with_handoff(handoff.clone()))
        .with_agent(Agent::new("Billing"));

    let result = Runner::new(provider.clone()).run(&agents, "refund").await.unwrap();

    assert_eq!(result.last_agent, "Billing");
    assert_eq!(result.context.get("note"), Some(&json!("no id")));
    assert_eq!(provider.requests()[0].tools[0].parameters, contract);

    let payload = HandoffPayload::from_arguments(&json!({"note": "no id"}));
    assert!(matches!(
        validate_payload(&handoff, &payload),
        Err(BatonError::Validation(_))
    ));
}

#[tokio::test]
async fn malformed_handoff_arguments_still_transfer() {
    let provider = scripted([
        ModelResponse::new(Usage::new(1, 1)).function_call("transfer_to_billing", "{not json", "c1"),
        final_turn("billing", Usage::new(1, 1)),
    ]);
    let agents = AgentSet::new(Agent::new("Triage").with_handoff("Billing"))
        .with_agent(Agent::new("Billing"));

    let result = Runner::new(provider).run(&agents, "refund").await.unwrap();

    assert_eq!(result.last_agent, "Billing");
    assert!(result.context.shared_context().is_empty());
}

#[tokio::test]
async fn seeded_context_survives_handoffs() {
    let mut seed = Map::new();
    seed.insert("customer".into(), json!("c-42"));
    seed.insert("tier".into(), json!("basic"));
    let provider = scripted([
        ModelResponse::new(Usage::new(1, 1)).function_call(
            "transfer_to_billing",
            r#"{"data": {"tier": "gold"}}"#,
            "c1",
        ),
        final_turn("done", Usage::new(1, 1)),
    ]);
    let agents = AgentSet::new(Agent::new("Triage").with_handoff("Billing"))
        .with_agent(Agent::new("Billing"));

    let result = Runner::new(provider)
        .run_with_context(
            &agents,
            "hi",
            HandoffContext::new("Triage").with_shared_context(seed),
        )
        .await
        .unwrap();

    assert_eq!(result.context.get("customer"), Some(&json!("c-42")));
    assert_eq!(result.context.get("tier"), Some(&json!("gold")));
}

#[tokio::test]
async fn seeded_context_starts_at_the_entry_agent() {
    let provider = scripted([final_turn("hello", Usage::new(1, 1))]);
    let agents = AgentSet::new(Agent::new("Triage").with_handoff("Billing"))
        .with_agent(Agent::new("Billing"));

    let result = Runner::new(provider)
        .run_with_context(&agents, "hi", HandoffContext::new("Billing"))
        .await
        .unwrap();

    assert_eq!(result.last_agent, "Triage");
    assert_eq!(result.context.current_agent(), "Triage");
    assert!(result.context.handoff_chain().is_empty());
}

#[tokio::test]
async fn agent_names_are_snake_cased_into_tool_names() {
    let provider = scripted([
        handoff_turn("transfer_to_tier_two_support", "c1", Usage::new(1, 1)),
        final_turn("tier two", Usage::new(1, 1)),
    ]);
    let agents = AgentSet::new(Agent::new("Triage").with_handoff("Tier Two Support"))
        .with_agent(Agent::new("Tier Two Support"));

    let result = Runner::new(provider).run(&agents, "escalate").await.unwrap();

    assert_eq!(result.last_agent, "Tier Two Support");
}
