//! Integration tests for file-based flag definitions.

use pennant::prelude::*;
use pennant_config::{ConfigError, EnvLoader, FileFormat, FlagDocument};

const FLAGS_JSON: &str = r#"{
    "schema": {
        "theme": ["light", "dark", "system"],
        "new-checkout": "boolean",
        "max-items": "number"
    },
    "flags": {"theme": "dark"},
    "rollouts": [
        {"flag": "new-checkout", "percentage": 50, "variant": true}
    ],
    "rules": [
        {
            "flag": "theme",
            "variant": "system",
            "conditions": [
                {"attribute": "email", "operator": "ends_with", "values": ["@company.com"]}
            ]
        }
    ],
    "context": {"attributes": {"country": "ID"}}
}"#;

#[tokio::test]
async fn test_document_drives_client() {
    let client = FlagDocument::parse(FLAGS_JSON, FileFormat::Json)
        .unwrap()
        .into_client_builder()
        .unwrap()
        .build();
    client.initialize().await.unwrap();

    let staff = EvaluationContext::new().with_attribute("email", "ana@company.com");
    let theme = client.evaluate("theme", Some(&staff), None).await.unwrap();
    assert_eq!(theme, FlagValue::string("system"));

    let theme = client.evaluate("theme", None, None).await.unwrap();
    assert_eq!(theme, FlagValue::string("dark"));

    // user-1 buckets to 63 for this flag, outside a 50% rollout.
    let user = EvaluationContext::new().with_user_id("user-1");
    let checkout = client.get_bool("new-checkout", Some(&user), false).await.unwrap();
    assert!(!checkout);

    let items = client.evaluate("max-items", None, None).await.unwrap();
    assert_eq!(items, FlagValue::number(0.0));
}

#[test]
fn test_env_overrides_map_onto_schema_names() {
    let doc = FlagDocument::parse(FLAGS_JSON, FileFormat::Json).unwrap();
    let overrides = EnvLoader::default().flags_from(
        [
            ("PENNANT_FLAG_THEME", "light"),
            ("PENNANT_FLAG_MAX_ITEMS", "12"),
        ],
        &doc.schema,
    );

    let doc = doc.with_overrides(overrides);
    assert_eq!(doc.flags["theme"], FlagValue::string("light"));
    assert_eq!(doc.flags["max-items"], FlagValue::number(12.0));
    assert!(doc.into_rules().is_ok());
}

#[test]
fn test_env_override_outside_domain_fails_validation() {
    let doc = FlagDocument::parse(FLAGS_JSON, FileFormat::Json).unwrap();
    let overrides =
        EnvLoader::default().flags_from([("PENNANT_FLAG_NEW_CHECKOUT", "maybe")], &doc.schema);

    let result = doc.with_overrides(overrides).into_local_adapter();
    assert!(matches!(result, Err(ConfigError::Flag(FlagError::InvalidValue { .. }))));
}
