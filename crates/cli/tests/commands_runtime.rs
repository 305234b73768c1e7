use std::env;
use std::sync::{Mutex, OnceLock};

use leadly_cli::commands::{config, doctor};
use serde_json::Value;

#[test]
fn doctor_passes_with_credentials_for_the_active_chain() {
    with_env(
        &[
            ("LEADLY_OPENAI_API_KEY", "sk-test-openai"),
            ("LEADLY_ANTHROPIC_API_KEY", "sk-test-anthropic"),
        ],
        || {
            let result = doctor::run(true);
            assert_eq!(result.exit_code, 0, "passing doctor run should exit zero");

            let report = parse_payload(&result.output);
            assert_eq!(report["overall_status"], "pass");

            let checks = report["checks"].as_array().expect("checks array");
            let by_name = |name: &str| {
                checks
                    .iter()
                    .find(|check| check["name"] == name)
                    .unwrap_or_else(|| panic!("missing check {name}"))
            };

            assert_eq!(by_name("config_validation")["status"], "pass");
            assert_eq!(by_name("fallback_chain")["status"], "pass");
            assert_eq!(by_name("openai_credentials")["status"], "pass");
            assert_eq!(by_name("anthropic_credentials")["status"], "pass");
            // Tertiary slot is off by default, so Ollama is out of the chain.
            assert_eq!(by_name("ollama_credentials")["status"], "skipped");
        },
    );
}

#[test]
fn doctor_fails_when_a_chain_provider_has_no_credentials() {
    with_env(&[("LEADLY_ANTHROPIC_API_KEY", "sk-test-anthropic")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1, "failing doctor run should exit non-zero");

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");

        let checks = report["checks"].as_array().expect("checks array");
        let openai = checks
            .iter()
            .find(|check| check["name"] == "openai_credentials")
            .expect("openai check present");
        assert_eq!(openai["status"], "fail");
    });
}

#[test]
fn doctor_skips_provider_checks_when_ai_is_disabled() {
    with_env(&[("LEADLY_AI_ENABLED", "false")], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "pass");

        let checks = report["checks"].as_array().expect("checks array");
        for name in ["fallback_chain", "openai_credentials", "anthropic_credentials"] {
            let check = checks
                .iter()
                .find(|check| check["name"] == name)
                .unwrap_or_else(|| panic!("missing check {name}"));
            assert_eq!(check["status"], "skipped", "{name} should be skipped");
        }
    });
}

#[test]
fn doctor_human_output_lists_every_check() {
    with_env(&[("LEADLY_OPENAI_API_KEY", "sk-test-openai")], || {
        let output = doctor::run(false).output;
        assert!(output.contains("config_validation"));
        assert!(output.contains("fallback_chain"));
        assert!(output.contains("openai_credentials"));
    });
}

#[test]
fn config_redacts_api_keys_and_names_the_env_source() {
    with_env(&[("LEADLY_OPENAI_API_KEY", "sk-test-secret-value")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("ai.openai_api_key = <redacted>"));
        assert!(result.output.contains("env (LEADLY_OPENAI_API_KEY)"));
        assert!(!result.output.contains("sk-test-secret-value"));
    });
}

#[test]
fn config_reports_defaults_when_nothing_is_set() {
    with_env(&[], || {
        let output = config::run().output;
        assert!(output.contains("ai.enabled = true (source: default)"));
        assert!(output.contains("ai.primary_provider = openai (source: default)"));
        assert!(output.contains("ai.anthropic_api_key = <unset>"));
    });
}

#[test]
fn config_surfaces_validation_failures() {
    with_env(&[("LEADLY_AI_PRIMARY_PROVIDER", "grok")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2, "invalid config should exit non-zero");
        assert!(result.output.contains("config validation failed"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LEADLY_AI_ENABLED",
        "LEADLY_AI_PRIMARY_PROVIDER",
        "LEADLY_AI_FALLBACK_SECONDARY_ENABLED",
        "LEADLY_AI_FALLBACK_TERTIARY_ENABLED",
        "LEADLY_OPENAI_API_KEY",
        "LEADLY_ANTHROPIC_API_KEY",
        "LEADLY_OLLAMA_BASE_URL",
        "LEADLY_AI_REQUEST_TIMEOUT_SECS",
        "LEADLY_AI_MAX_ATTEMPTS",
        "LEADLY_LOG_LEVEL",
        "LEADLY_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, previous) in previous_values {
        match previous {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}
