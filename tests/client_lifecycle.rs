//! Integration tests for the client facade.
//!
//! Lifecycle guards, failure containment and exposure reporting, driven
//! through the mock adapter.

use pennant::prelude::*;
use pennant_testing::{ExposureRecorder, MockAdapter};
use std::time::Duration;

fn theme_schema() -> FlagSchema {
    FlagSchema::new()
        .with_enum("theme", ["light", "dark", "system"])
        .unwrap()
        .with_flag("new-checkout", VariantDomain::boolean())
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_evaluate_requires_initialize() {
    let adapter = MockAdapter::new().with_value("theme", "dark");
    let client = FlagClient::builder(adapter.clone()).build();

    let contexts = [
        None,
        Some(EvaluationContext::new()),
        Some(EvaluationContext::new().with_user_id("123")),
    ];
    for ctx in &contexts {
        for flag in ["theme", "new-checkout", "ghost"] {
            let result = client.evaluate(flag, ctx.as_ref(), Some("x".into())).await;
            assert_eq!(result, Err(FlagError::NotInitialized));
        }
    }

    assert!(adapter.evaluations().is_empty());
}

#[tokio::test]
async fn test_concurrent_initialize_runs_adapter_once() {
    let adapter = MockAdapter::new().with_init_delay(Duration::from_millis(25));
    let client = FlagClient::builder(adapter.clone()).build();

    let results = futures::future::join_all((0..16).map(|_| client.initialize())).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(adapter.initialize_calls(), 1);
    assert_eq!(client.state(), ClientState::Ready);
}

#[tokio::test]
async fn test_waiters_share_initialize_failure() {
    let adapter = MockAdapter::new()
        .with_init_delay(Duration::from_millis(10))
        .failing_initialize(1);
    let client = FlagClient::builder(adapter.clone()).build();

    let (a, b) = tokio::join!(client.initialize(), client.initialize());
    assert!(matches!(a, Err(FlagError::Initialization(_))));
    assert_eq!(a, b);
    assert_eq!(adapter.initialize_calls(), 1);
    assert_eq!(client.state(), ClientState::Uninitialized);

    client.initialize().await.unwrap();
    assert_eq!(adapter.initialize_calls(), 2);
}

#[tokio::test]
async fn test_close_never_fails() {
    let adapter = MockAdapter::new().failing_close("connection reset");
    let client = FlagClient::builder(adapter.clone()).build();

    client.close().await;
    assert_eq!(adapter.close_calls(), 0);

    client.initialize().await.unwrap();
    client.close().await;
    client.close().await;

    assert_eq!(adapter.close_calls(), 1);
    assert_eq!(client.state(), ClientState::Closed);
}

#[tokio::test]
async fn test_clones_share_lifecycle() {
    let client = FlagClient::builder(MockAdapter::new()).build();
    let other = client.clone();

    client.initialize().await.unwrap();
    assert!(other.is_ready());

    other.close().await;
    assert_eq!(client.state(), ClientState::Closed);
}

/// Adapter written against the facade crate's re-exports only.
struct HeaderAdapter;

#[pennant::async_trait]
impl FlagAdapter for HeaderAdapter {
    fn name(&self) -> &str {
        "header"
    }

    async fn initialize(&self) -> FlagResult<()> {
        Ok(())
    }

    async fn evaluate(
        &self,
        flag: &str,
        context: &EvaluationContext,
        _default: Option<&FlagValue>,
    ) -> FlagResult<Option<FlagValue>> {
        Ok(context.get(flag).map(|v| FlagValue::string(v.into_owned())))
    }
}

#[tokio::test]
async fn test_custom_adapter_through_reexports() {
    let client = FlagClient::builder(HeaderAdapter)
        .context(EvaluationContext::new().with_attribute("theme", "dark"))
        .build();
    client.initialize().await.unwrap();

    let value = client.evaluate("theme", None, None).await.unwrap();
    assert_eq!(value, FlagValue::string("dark"));

    fn serializable<T: pennant::serde::Serialize>(_: &T) {}
    serializable(client.base_context());
}

// =============================================================================
// Failure containment
// =============================================================================

#[tokio::test]
async fn test_adapter_failure_resolves_to_fallback() {
    let adapter = MockAdapter::new().with_failure("theme", "vendor timeout");
    let recorder = ExposureRecorder::new();
    let client = FlagClient::builder(adapter.clone())
        .schema(theme_schema())
        .on_exposure(recorder.callback())
        .build();
    client.initialize().await.unwrap();

    let value = client
        .evaluate("theme", None, Some(FlagValue::string("dark")))
        .await
        .unwrap();
    assert_eq!(value, FlagValue::string("dark"));

    let value = client.evaluate("theme", None, None).await.unwrap();
    assert_eq!(value, FlagValue::string("light"));

    assert_eq!(adapter.evaluation_count("theme"), 2);
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_adapter_failure_without_any_fallback() {
    let adapter = MockAdapter::new().with_failure("ghost", "vendor timeout");
    let client = FlagClient::builder(adapter).build();
    client.initialize().await.unwrap();

    let result = client.evaluate("ghost", None, None).await;
    assert_eq!(result, Err(FlagError::UnknownFlag("ghost".into())));
}

#[tokio::test]
async fn test_adapter_receives_resolved_fallback() {
    let adapter = MockAdapter::new();
    let client = FlagClient::builder(adapter.clone())
        .schema(theme_schema())
        .build();
    client.initialize().await.unwrap();

    client.evaluate("theme", None, None).await.unwrap();
    assert_eq!(
        adapter.last_evaluation().unwrap().default,
        Some(FlagValue::string("light"))
    );

    client
        .evaluate("theme", None, Some(FlagValue::string("system")))
        .await
        .unwrap();
    assert_eq!(
        adapter.last_evaluation().unwrap().default,
        Some(FlagValue::string("system"))
    );
}

// =============================================================================
// Exposure
// =============================================================================

#[tokio::test]
async fn test_exposure_per_successful_evaluation() {
    let adapter = MockAdapter::new()
        .with_value("theme", "dark")
        .with_value("new-checkout", true);
    let recorder = ExposureRecorder::new();
    let client = FlagClient::builder(adapter.clone())
        .schema(theme_schema())
        .context(EvaluationContext::new().with_user_id("default-user"))
        .on_exposure(recorder.callback())
        .build();
    client.initialize().await.unwrap();

    let ctx = EvaluationContext::new()
        .with_user_id("123")
        .with_attribute("plan", "premium");
    client.evaluate("theme", Some(&ctx), None).await.unwrap();
    client.evaluate("new-checkout", None, None).await.unwrap();

    let exposures = recorder.exposures();
    assert_eq!(exposures.len(), 2);
    assert_eq!(exposures[0].flag, "theme");
    assert_eq!(exposures[0].value, FlagValue::string("dark"));
    assert_eq!(exposures[0].context.user_id(), Some("123"));
    assert_eq!(exposures[1].context.user_id(), Some("default-user"));

    // The adapter sees the merged context too.
    let calls = adapter.evaluations();
    assert_eq!(calls[0].context.get("plan").as_deref(), Some("premium"));
    assert_eq!(calls[0].context.user_id(), Some("123"));
}

#[tokio::test]
async fn test_out_of_domain_adapter_value_is_not_served() {
    let adapter = MockAdapter::new().with_value("theme", "purple");
    let recorder = ExposureRecorder::new();
    let client = FlagClient::builder(adapter)
        .schema(theme_schema())
        .on_exposure(recorder.callback())
        .build();
    client.initialize().await.unwrap();

    let value = client.evaluate("theme", None, None).await.unwrap();
    assert_eq!(value, FlagValue::string("light"));
    assert!(recorder.is_empty());
}

#[tokio::test]
async fn test_scoped_clients_do_not_share_context() {
    let rules = FlagRules::builder()
        .rule(RolloutRule::when_all(
            "admin-panel",
            vec![Condition::is_in("role", ["admin"])],
            true,
        ))
        .build();
    let recorder = ExposureRecorder::new();
    let client = FlagClient::local(rules)
        .on_exposure(recorder.callback())
        .build();
    client.initialize().await.unwrap();

    let requests: Vec<_> = (0..20)
        .map(|i| {
            let role = if i % 2 == 0 { "admin" } else { "viewer" };
            let scoped = client.scoped(
                EvaluationContext::new()
                    .with_user_id(format!("user-{i}"))
                    .with_attribute("role", role),
            );
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                (role, scoped.is_enabled("admin-panel").await.unwrap())
            })
        })
        .collect();

    for request in requests {
        let (role, enabled) = request.await.unwrap();
        assert_eq!(enabled, role == "admin");
    }
    assert_eq!(recorder.count(), 20);
}
