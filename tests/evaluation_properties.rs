//! Integration tests for the evaluation engine.
//!
//! Bucketing, precedence and context merging as seen through the public API.

use pennant::*;
use serde_json::json;

// =============================================================================
// Bucketing
// =============================================================================

#[test]
fn test_bucket_is_deterministic_and_in_range() {
    let subjects = ["", "anonymous", "user-1", "123", "ü-ñ", "\u{1F600}", "a:b:c"];
    let flags = ["new-checkout", "beta", ""];
    let seeds = [DEFAULT_SEED, "v2", ""];

    for subject in subjects {
        for flag in flags {
            for seed in seeds {
                let first = bucket_of(subject, flag, seed);
                assert!(first < 100, "{subject}/{flag}/{seed} -> {first}");
                for _ in 0..3 {
                    assert_eq!(bucket_of(subject, flag, seed), first);
                }
            }
        }
    }
}

#[test]
fn test_known_buckets_are_stable() {
    // Moving any of these would silently move live rollout populations.
    assert_eq!(hash_key("hello"), 99162322);
    assert_eq!(bucket_of("user-1", "new-checkout", "default"), 63);
    assert_eq!(bucket_of("123", "beta", "default"), 3);
    assert_eq!(bucket_of("alice", "theme", "default"), 82);
    assert_eq!(bucket_of("user-1", "new-checkout", "v2"), 76);
}

#[test]
fn test_rollout_boundaries() {
    for i in 0..500 {
        let subject = format!("subject-{i}");
        assert!(!is_in_rollout(&subject, 0.0, "beta", DEFAULT_SEED));
        assert!(is_in_rollout(&subject, 100.0, "beta", DEFAULT_SEED));
    }
}

#[test]
fn test_half_rollout_distribution() {
    let included = (0..1000)
        .filter(|i| is_in_rollout(&format!("user-{i}"), 50.0, "test-flag", DEFAULT_SEED))
        .count();

    assert!((400..=600).contains(&included), "{included} of 1000 included");
}

#[test]
fn test_widening_rollout_keeps_existing_subjects() {
    for i in 0..200 {
        let subject = format!("user-{i}");
        if is_in_rollout(&subject, 10.0, "search-v2", DEFAULT_SEED) {
            assert!(is_in_rollout(&subject, 25.0, "search-v2", DEFAULT_SEED));
        }
    }
}

// =============================================================================
// Precedence
// =============================================================================

fn everything_configured() -> FlagRules {
    FlagRules::builder()
        .rule(RolloutRule::new(
            "checkout",
            |ctx| ctx.get("plan").as_deref() == Some("premium"),
            "vip-variant",
        ))
        .rollout(PercentageRollout::new("checkout", 100.0, "rollout-variant").unwrap())
        .static_flag("checkout", "control")
        .build()
}

#[test]
fn test_precedence_order() {
    let rules = everything_configured();
    let fallback = FlagValue::string("fallback");

    let premium = EvaluationContext::new()
        .with_user_id("123")
        .with_attribute("plan", "premium");
    let resolution = evaluate_detailed("checkout", &premium, Some(&fallback), &rules).unwrap();
    assert_eq!(resolution.value, FlagValue::string("vip-variant"));
    assert_eq!(resolution.reason, ResolutionReason::RuleMatch { index: 0 });

    let free = EvaluationContext::new()
        .with_user_id("123")
        .with_attribute("plan", "free");
    assert_eq!(
        evaluate("checkout", &free, Some(&fallback), &rules),
        Some(FlagValue::string("rollout-variant"))
    );

    let anonymous = EvaluationContext::new().with_attribute("plan", "free");
    assert_eq!(
        evaluate("checkout", &anonymous, Some(&fallback), &rules),
        Some(FlagValue::string("control"))
    );
}

#[test]
fn test_rollout_skipped_without_user_id() {
    let rules = FlagRules::builder()
        .rollout(PercentageRollout::new("checkout", 100.0, "rollout-variant").unwrap())
        .static_flag("checkout", "control")
        .build();

    for ctx in [
        EvaluationContext::new(),
        EvaluationContext::new().with_user_id(""),
    ] {
        let resolution = evaluate_detailed("checkout", &ctx, None, &rules).unwrap();
        assert_eq!(resolution.value, FlagValue::string("control"));
        assert_eq!(resolution.reason, ResolutionReason::Static);
    }
}

#[test]
fn test_defaults_close_the_chain() {
    let schema = FlagSchema::new()
        .with_enum("theme", ["light", "dark", "system"])
        .unwrap()
        .with_flag("limit", VariantDomain::number())
        .with_flag("beta", VariantDomain::boolean())
        .with_flag("banner", VariantDomain::string());
    let rules = FlagRules::builder().schema(schema).build();
    let ctx = EvaluationContext::new();

    let caller = FlagValue::string("dark");
    let resolution = evaluate_detailed("theme", &ctx, Some(&caller), &rules).unwrap();
    assert_eq!(resolution.reason, ResolutionReason::CallerDefault);
    assert_eq!(resolution.value, caller);

    assert_eq!(evaluate("theme", &ctx, None, &rules), Some(FlagValue::string("light")));
    assert_eq!(evaluate("limit", &ctx, None, &rules), Some(FlagValue::number(0.0)));
    assert_eq!(evaluate("beta", &ctx, None, &rules), Some(FlagValue::boolean(false)));
    assert_eq!(evaluate("banner", &ctx, None, &rules), Some(FlagValue::string("")));
    assert_eq!(evaluate("undeclared", &ctx, None, &rules), None);
}

// =============================================================================
// Context merge
// =============================================================================

#[test]
fn test_context_merge() {
    let base: EvaluationContext = serde_json::from_value(json!({
        "userId": "default-user",
        "attributes": {"country": "ID", "plan": "free"}
    }))
    .unwrap();
    let call: EvaluationContext = serde_json::from_value(json!({
        "userId": "123",
        "attributes": {"plan": "premium", "feature": "beta"}
    }))
    .unwrap();

    let merged = merge(&base, &call);

    let expected = EvaluationContext::new()
        .with_user_id("123")
        .with_attribute("country", "ID")
        .with_attribute("plan", "premium")
        .with_attribute("feature", "beta");
    assert_eq!(merged, expected);

    // Inputs are untouched.
    assert_eq!(base.user_id(), Some("default-user"));
    assert_eq!(call.attribute("country"), None);
}

#[test]
fn test_merge_keeps_base_user_without_override() {
    let base = EvaluationContext::new().with_user_id("default-user");
    let call = EvaluationContext::new().with_attribute("plan", "team");

    let merged = base.merged_with(&call);
    assert_eq!(merged.user_id(), Some("default-user"));
    assert_eq!(merged.get("plan").as_deref(), Some("team"));
}
