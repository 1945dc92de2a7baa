mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{user_turn, CountingGuardrail, ScriptedModel};
use turnstile::context::InvocationContext;
use turnstile::error::TurnstileError;
use turnstile::guardrail::{
    Guardrail, GuardrailChain, GuardrailFailure, GuardrailRequest, GuardrailResult,
    InputGuardrailChain, OutputGuardrailChain,
};
use turnstile::turn::{TurnOrchestrator, TurnRequest, TurnStatus, TurnSubscribers};

fn request(text: &str) -> GuardrailRequest {
    GuardrailRequest::new(text, InvocationContext::default())
}

#[test]
fn chain_runs_in_registration_order_and_stops_after_fatal() {
    let (a, a_runs) = CountingGuardrail::passing("a");
    let (b, b_runs) = CountingGuardrail::fatal("b", "blocked");
    let (c, c_runs) = CountingGuardrail::passing("c");
    let chain = GuardrailChain::new(vec![a, b, c]);

    let result = chain.execute(request("hello")).unwrap();

    assert!(result.is_fatal());
    assert_eq!(a_runs.load(Ordering::SeqCst), 1);
    assert_eq!(b_runs.load(Ordering::SeqCst), 1);
    assert_eq!(c_runs.load(Ordering::SeqCst), 0);
}

#[test]
fn fatal_discards_previously_accumulated_failures() {
    let (a, _) = CountingGuardrail::failing("a", "first problem");
    let (b, _) = CountingGuardrail::fatal("b", "blocked");
    let chain = GuardrailChain::new(vec![a, b]);

    let result = chain.execute(request("hello")).unwrap();

    match result {
        GuardrailResult::Fatal(failures) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].message, "blocked");
            assert_eq!(failures[0].guardrail.as_deref(), Some("b"));
        }
        other => panic!("expected fatal, got {other:?}"),
    }
}

#[test]
fn rewrite_is_visible_to_the_next_guardrail() {
    let (a, _) = CountingGuardrail::rewriting("a", "rewritten");
    let (b, _) = CountingGuardrail::with("b", |req| {
        assert_eq!(req.text, "rewritten");
        Ok(GuardrailResult::success())
    });
    let chain = GuardrailChain::new(vec![a, b]);

    let result = chain.execute(request("original")).unwrap();
    match result {
        GuardrailResult::SuccessWith { text } => assert_eq!(text, "rewritten"),
        other => panic!("expected rewrite to survive composition, got {other:?}"),
    }
}

#[test]
fn later_rewrite_supersedes_an_earlier_one() {
    let (a, _) = CountingGuardrail::rewriting("a", "first");
    let (b, _) = CountingGuardrail::rewriting("b", "second");
    let chain = GuardrailChain::new(vec![a, b]);

    match chain.execute(request("original")).unwrap() {
        GuardrailResult::SuccessWith { text } => assert_eq!(text, "second"),
        other => panic!("expected the later rewrite, got {other:?}"),
    }
}

#[test]
fn non_fatal_failures_accumulate_in_chain_order() {
    let (a, _) = CountingGuardrail::failing("a", "first");
    let (b, b_runs) = CountingGuardrail::failing("b", "second");
    let chain = GuardrailChain::new(vec![a, b]);

    match chain.execute(request("hello")).unwrap() {
        GuardrailResult::Failure(failures) => {
            assert_eq!(failures.len(), 2);
            assert_eq!(failures[0].message, "first");
            assert_eq!(failures[0].guardrail.as_deref(), Some("a"));
            assert_eq!(failures[1].message, "second");
            assert_eq!(failures[1].guardrail.as_deref(), Some("b"));
        }
        other => panic!("expected accumulated failures, got {other:?}"),
    }
    // Non-fatal failures do not stop the chain.
    assert_eq!(b_runs.load(Ordering::SeqCst), 1);
}

#[test]
fn multi_record_failure_from_one_guardrail_is_rejected() {
    struct TwoRecords;
    impl Guardrail for TwoRecords {
        fn name(&self) -> &str {
            "two-records"
        }
        fn validate(
            &self,
            _request: &GuardrailRequest,
        ) -> turnstile::error::Result<GuardrailResult> {
            Ok(GuardrailResult::Failure(vec![
                GuardrailFailure::new("one"),
                GuardrailFailure::new("two"),
            ]))
        }
    }

    let chain = GuardrailChain::new(vec![Arc::new(TwoRecords)]);
    let err = chain.execute(request("hello")).unwrap_err();
    assert!(matches!(err, TurnstileError::InvalidState(_)));
}

#[test]
fn guardrail_fault_aborts_the_chain() {
    let (a, _) = CountingGuardrail::with("a", |_| {
        Err(TurnstileError::Internal("guardrail bug".into()))
    });
    let (b, b_runs) = CountingGuardrail::passing("b");
    let chain = GuardrailChain::new(vec![a, b]);

    let err = chain.execute(request("hello")).unwrap_err();
    assert!(matches!(err, TurnstileError::GuardrailExecution { .. }));
    assert_eq!(b_runs.load(Ordering::SeqCst), 0);
}

#[test]
fn input_chain_enforce_maps_failure_to_input_error() {
    let (a, _) = CountingGuardrail::failing("a", "not allowed");
    let chain = InputGuardrailChain::new(vec![a]);

    let err = chain.enforce(request("hello")).unwrap_err();
    assert!(matches!(err, TurnstileError::InputGuardrail { .. }));
    assert!(err.to_string().contains("not allowed"));
}

#[test]
fn output_chain_enforce_returns_rewritten_text() {
    let (a, _) = CountingGuardrail::rewriting("a", "sanitized");
    let chain = OutputGuardrailChain::new(vec![a]);

    let text = chain.enforce(request("raw output")).unwrap();
    assert_eq!(text, "sanitized");
}

#[tokio::test]
async fn input_guardrail_failure_prevents_the_model_call() {
    let model = ScriptedModel::new();
    let (blocker, _) = CountingGuardrail::fatal("blocker", "blocked");
    let orchestrator = TurnOrchestrator::new(model.clone())
        .with_input_guardrails(InputGuardrailChain::new(vec![blocker]));

    let handle = orchestrator
        .start(
            TurnRequest::new(user_turn("hi")),
            TurnSubscribers::new().ignore_errors(),
        )
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(result.status, TurnStatus::Failed);
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn input_rewrite_reaches_the_model() {
    let model = ScriptedModel::new();
    model.queue_text("ok");
    let (rewriter, _) = CountingGuardrail::rewriting("rewriter", "safe version");
    let orchestrator = TurnOrchestrator::new(model.clone())
        .with_input_guardrails(InputGuardrailChain::new(vec![rewriter]));

    let handle = orchestrator
        .start(
            TurnRequest::new(user_turn("raw version")),
            TurnSubscribers::new().ignore_errors(),
        )
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(result.status, TurnStatus::Completed);
    let sent = model.last_request.lock().unwrap().clone().unwrap();
    let user_text = sent
        .messages
        .iter()
        .rev()
        .find(|m| m.role == turnstile::types::Role::User)
        .unwrap()
        .text();
    assert_eq!(user_text, "safe version");
}

#[tokio::test]
async fn output_guardrail_rewrites_the_final_response() {
    let model = ScriptedModel::new();
    model.queue_text("unfiltered");
    let (rewriter, _) = CountingGuardrail::rewriting("rewriter", "filtered");
    let orchestrator = TurnOrchestrator::new(model)
        .with_output_guardrails(OutputGuardrailChain::new(vec![rewriter]));

    let handle = orchestrator
        .start(
            TurnRequest::new(user_turn("hi")),
            TurnSubscribers::new().ignore_errors(),
        )
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(result.status, TurnStatus::Completed);
    assert_eq!(result.response.unwrap().text(), "filtered");
}
