use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use procure_cli::commands::{config, doctor, history, migrate, route, seed};
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn migrate_returns_success_with_file_database() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_when_roles_collide() {
    let dir = TempDir::new().expect("tempdir");
    let mut vars = database_env(dir.path());
    vars.push(("PROCURE_WORKFLOW_APPROVER_ROLE", "gsa18f_purchaser".to_string()));

    with_env(&vars, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_loads_and_verifies_default_roles() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("sample request pr-seed-001"));
        assert!(message.contains("  - gsa18f_approver"));
        assert!(message.contains("  - gsa18f_micropurchase_purchaser"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        let first = seed::run();
        let second = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn seed_reports_roles_the_configured_tenant_cannot_resolve() {
    let dir = TempDir::new().expect("tempdir");
    let mut vars = database_env(dir.path());
    vars.push(("PROCURE_WORKFLOW_APPROVER_ROLE", "ncr_approver".to_string()));

    with_env(&vars, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "seed_verification");
        assert_eq!(
            payload["message"],
            "Seed verification failed for checks: role-resolves:ncr_approver"
        );
    });
}

#[test]
fn route_assigns_the_approver_then_the_micropurchaser() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        assert_eq!(seed::run().exit_code, 0);

        let result = route::run("pr-seed-001", None);
        assert_eq!(result.exit_code, 0, "expected routing success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "route");
        let details = &payload["details"];
        assert_eq!(details["proposal_id"], "proposal-seed-001");
        assert_eq!(details["steps"][0]["kind"], "approval");
        assert_eq!(details["steps"][0]["assignee"], "approver@gsa.gov");
        assert_eq!(details["steps"][1]["kind"], "purchase");
        assert_eq!(details["steps"][1]["role"], "gsa18f_micropurchase_purchaser");
        assert_eq!(details["steps"][1]["assignee"], "micropurchaser@gsa.gov");
        assert_eq!(details["subscribers_notified"], false);
        assert_eq!(details["audit_events"][0], "workflow.steps_initialized");
    });
}

#[test]
fn route_with_comment_notifies_subscribers() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        assert_eq!(seed::run().exit_code, 0);

        let result = route::run("pr-seed-001", Some("Routed for approval"));
        assert_eq!(result.exit_code, 0, "expected routing success: {}", result.output);

        let details = &parse_payload(&result.output)["details"];
        assert_eq!(details["subscribers_notified"], true);
        assert_eq!(details["audit_events"][1], "workflow.subscribers_notified");
    });
}

#[test]
fn routing_the_same_request_twice_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        assert_eq!(seed::run().exit_code, 0);
        assert_eq!(route::run("pr-seed-001", None).exit_code, 0);

        let second = route::run("pr-seed-001", None);
        assert_eq!(second.exit_code, 10);

        let payload = parse_payload(&second.output);
        assert_eq!(payload["error_class"], "steps_already_initialized");
    });
}

#[test]
fn routing_an_unknown_request_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        let result = route::run("pr-missing", None);
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "not_found");
    });
}

#[test]
fn routing_without_role_holders_is_a_configuration_failure() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        assert_eq!(seed::run().exit_code, 0);
    });

    let mut vars = database_env(dir.path());
    vars.push(("PROCURE_WORKFLOW_TENANT", "ncr".to_string()));
    with_env(&vars, || {
        let result = route::run("pr-seed-001", None);
        assert_eq!(result.exit_code, 8);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "workflow_configuration");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("gsa18f_approver"), "unexpected message: {message}");
    });
}

#[test]
fn history_renders_display_fields_and_stored_steps() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        assert_eq!(seed::run().exit_code, 0);
        assert_eq!(route::run("pr-seed-001", None).exit_code, 0);

        let result = history::run("pr-seed-001");
        assert_eq!(result.exit_code, 0, "expected history success: {}", result.output);

        let details = &parse_payload(&result.output)["details"];
        assert_eq!(details["public_identifier"], "#proposal-seed-001");
        assert_eq!(details["fields"]["office"], "Dayton");
        assert_eq!(details["fields"]["purchase_type"], "Micropurchase");
        assert_eq!(details["fields"]["total_price"], "370.00");
        assert_eq!(details["fields"]["additional_info"], "--");
        assert_eq!(details["steps"][0]["assignee"], "approver@gsa.gov");
        assert_eq!(details["steps"][1]["assignee"], "micropurchaser@gsa.gov");
    });
}

#[test]
fn history_before_routing_has_no_steps() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        assert_eq!(seed::run().exit_code, 0);

        let result = history::run("pr-seed-001");
        assert_eq!(result.exit_code, 0);

        let details = &parse_payload(&result.output)["details"];
        assert_eq!(details["steps"], Value::Array(Vec::new()));
    });
}

#[test]
fn doctor_passes_once_roles_are_seeded() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        assert_eq!(seed::run().exit_code, 0);

        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0, "expected doctor pass: {}", result.output);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "pass");
        assert_eq!(report["checks"].as_array().map(Vec::len), Some(4));
    });
}

#[test]
fn doctor_flags_unseeded_roles() {
    let dir = TempDir::new().expect("tempdir");
    with_env(&database_env(dir.path()), || {
        assert_eq!(migrate::run().exit_code, 0);

        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let report = parse_payload(&result.output);
        assert_eq!(report["overall_status"], "fail");
        let role_check = report["checks"]
            .as_array()
            .and_then(|checks| checks.iter().find(|check| check["name"] == "role_resolution"))
            .cloned()
            .unwrap_or(Value::Null);
        assert_eq!(role_check["status"], "fail");
    });
}

#[test]
fn config_attributes_env_sources() {
    let dir = TempDir::new().expect("tempdir");
    let mut vars = database_env(dir.path());
    vars.push(("PROCURE_WORKFLOW_TENANT", "ncr".to_string()));

    with_env(&vars, || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or("");
        assert!(
            message.contains("- workflow.tenant = ncr (source: env (PROCURE_WORKFLOW_TENANT))")
        );
        assert!(message.contains("- logging.level = info (source: default)"));
    });
}

fn database_env(dir: &Path) -> Vec<(&'static str, String)> {
    vec![
        ("PROCURE_DATABASE_URL", format!("sqlite://{}", dir.join("procure.db").display())),
        ("PROCURE_DATABASE_MAX_CONNECTIONS", "1".to_string()),
    ]
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, String)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "PROCURE_DATABASE_URL",
        "PROCURE_DATABASE_MAX_CONNECTIONS",
        "PROCURE_DATABASE_TIMEOUT_SECS",
        "PROCURE_WORKFLOW_TENANT",
        "PROCURE_WORKFLOW_APPROVER_ROLE",
        "PROCURE_WORKFLOW_PURCHASER_ROLE",
        "PROCURE_WORKFLOW_MICROPURCHASE_PURCHASER_ROLE",
        "PROCURE_LOGGING_LEVEL",
        "PROCURE_LOGGING_FORMAT",
        "PROCURE_LOG_LEVEL",
        "PROCURE_LOG_FORMAT",
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

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
