//! Error classification and how provider failures surface from a run.

mod common;

use std::sync::Arc;
use std::time::Duration;

use baton::agent::{Agent, AgentSet};
use baton::agent_loop::Runner;
use baton::error::{BatonError, ErrorCategory, RecoverySuggestion};
use baton::provider::{RetryingProvider, ScriptedProvider};
use baton::types::Usage;
use baton::util::RetryPolicy;
use common::final_turn;

#[test]
fn engine_errors_have_categories() {
    let cases = [
        (BatonError::MaxTurnsExceeded { max_turns: 3 }, ErrorCategory::TurnLimit),
        (BatonError::StopRequested, ErrorCategory::Cancelled),
        (BatonError::AgentNotFound("Ghost".into()), ErrorCategory::Configuration),
        (BatonError::HandoffConstruction("dup".into()), ErrorCategory::Configuration),
        (BatonError::Validation("empty".into()), ErrorCategory::Validation),
        (
            BatonError::InputGuardrailTriggered {
                guardrail: "len".into(),
                message: "too long".into(),
            },
            ErrorCategory::Guardrail,
        ),
        (BatonError::api(401, "nope"), ErrorCategory::Authentication),
        (BatonError::api(400, "rate limit exceeded"), ErrorCategory::RateLimit),
        (BatonError::provider("scripted", "server overloaded"), ErrorCategory::ModelOverloaded),
    ];
    for (error, expected) in cases {
        assert_eq!(error.category(), expected, "{error}");
    }
}

#[test]
fn recovery_suggestions_follow_category() {
    assert_eq!(
        BatonError::MaxTurnsExceeded { max_turns: 10 }.recovery_suggestion(),
        RecoverySuggestion::IncreaseTurnBudget
    );
    assert_eq!(
        BatonError::Network("dns".into()).recovery_suggestion(),
        RecoverySuggestion::RetryWithBackoff
    );
    assert_eq!(
        BatonError::Authentication("bad key".into()).recovery_suggestion(),
        RecoverySuggestion::CheckCredentials
    );
}

#[test]
fn messages_name_the_failing_stage() {
    let err = BatonError::HandoffHook {
        from: "Triage".into(),
        to: "Billing".into(),
        message: "closed".into(),
    };
    assert_eq!(err.to_string(), "Handoff hook failed for Triage -> Billing: closed");
    assert_eq!(
        BatonError::MaxTurnsExceeded { max_turns: 5 }.to_string(),
        "Max turns (5) exceeded"
    );
}

#[tokio::test(start_paused = true)]
async fn retrying_provider_hides_transient_failures_from_the_run() {
    let inner = Arc::new(
        ScriptedProvider::new()
            .fail(BatonError::api(529, "overloaded"))
            .respond(final_turn("recovered", Usage::new(3, 4))),
    );
    let policy = RetryPolicy {
        initial_backoff: Duration::from_millis(10),
        ..RetryPolicy::default()
    };
    let runner = Runner::new(Arc::new(RetryingProvider::new(inner.clone(), policy)));

    let result = runner
        .run(&AgentSet::new(Agent::new("Primary")), "hi")
        .await
        .unwrap();

    assert_eq!(result.final_output, "recovered");
    assert_eq!(result.usage.total_tokens, 7);
    assert_eq!(inner.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_provider_errors_end_the_run() {
    let inner = Arc::new(
        ScriptedProvider::new()
            .fail(BatonError::Authentication("invalid api key".into()))
            .respond(final_turn("unreachable", Usage::default())),
    );
    let runner = Runner::new(Arc::new(RetryingProvider::new(inner.clone(), RetryPolicy::default())));

    let err = runner
        .run(&AgentSet::new(Agent::new("Primary")), "hi")
        .await
        .unwrap_err();

    assert!(matches!(err, BatonError::Authentication(_)));
    assert_eq!(inner.call_count(), 1);
}
