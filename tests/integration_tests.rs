//! Integration tests for dealflow
//!
//! These drive the binary end to end, against an in-process stub of the CRM
//! service where a command needs one.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// A dealflow Command isolated from the caller's environment and user config.
fn dealflow(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("dealflow");
    cmd.current_dir(dir.path())
        .env_remove("DEALFLOW_API_URL")
        .env_remove("DEALFLOW_EMAIL")
        .env_remove("DEALFLOW_PASSWORD")
        .env_remove("RUST_LOG")
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env("HOME", dir.path());
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

fn write_session(dir: &TempDir, token: &str) {
    let dealflow_dir = dir.path().join(".dealflow");
    fs::create_dir_all(&dealflow_dir).unwrap();
    fs::write(
        dealflow_dir.join("session.json"),
        format!(r#"{{"token":"{}","user":null}}"#, token),
    )
    .unwrap();
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_dealflow_help() {
        let dir = create_temp_project();
        dealflow(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("board"))
            .stdout(predicate::str::contains("stats"));
    }

    #[test]
    fn test_dealflow_version() {
        let dir = create_temp_project();
        dealflow(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_init_creates_structure() {
        let dir = create_temp_project();
        dealflow(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized dealflow project"));

        assert!(dir.path().join(".dealflow/dealflow.toml").exists());
        let ignore = fs::read_to_string(dir.path().join(".dealflow/.gitignore")).unwrap();
        assert!(ignore.contains("session.json"));
    }

    #[test]
    fn test_init_idempotent() {
        let dir = create_temp_project();
        dealflow(&dir).arg("init").assert().success();
        dealflow(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));
    }

    #[test]
    fn test_init_records_api_url() {
        let dir = create_temp_project();
        dealflow(&dir)
            .args(["--api-url", "https://crm.example.com/api", "init"])
            .assert()
            .success();
        let content = fs::read_to_string(dir.path().join(".dealflow/dealflow.toml")).unwrap();
        assert!(content.contains("https://crm.example.com/api"));
    }

    #[test]
    fn test_project_dir_flag() {
        let dir = create_temp_project();
        let project = dir.path().join("elsewhere");
        fs::create_dir_all(&project).unwrap();
        dealflow(&dir)
            .arg("--project-dir")
            .arg(&project)
            .arg("init")
            .assert()
            .success();
        assert!(project.join(".dealflow/dealflow.toml").exists());
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        let dir = create_temp_project();
        dealflow(&dir).arg("teleport").assert().failure();
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod config {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();
        dealflow(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using default configuration"))
            .stdout(predicate::str::contains(
                "base_url = \"http://localhost:3000/api\" (default)",
            ))
            .stdout(predicate::str::contains("signed_in = no"));
    }

    #[test]
    fn test_config_show_reads_file() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".dealflow")).unwrap();
        fs::write(
            dir.path().join(".dealflow/dealflow.toml"),
            "[api]\nbase_url = \"http://crm.internal/api\"\ntimeout_secs = 5\n",
        )
        .unwrap();

        dealflow(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("timeout_secs = 5"))
            .stdout(predicate::str::contains(
                "base_url = \"http://crm.internal/api\" (dealflow.toml)",
            ));
    }

    #[test]
    fn test_env_overrides_file_and_cli_overrides_env() {
        let dir = create_temp_project();
        dealflow(&dir).args(["--api-url", "http://file/api", "init"]).assert().success();

        dealflow(&dir)
            .env("DEALFLOW_API_URL", "http://env/api")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "base_url = \"http://env/api\" (DEALFLOW_API_URL)",
            ));

        dealflow(&dir)
            .env("DEALFLOW_API_URL", "http://env/api")
            .args(["--api-url", "http://cli/api", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "base_url = \"http://cli/api\" (--api-url)",
            ));
    }

    #[test]
    fn test_dotenv_file_is_loaded() {
        let dir = create_temp_project();
        fs::write(dir.path().join(".env"), "DEALFLOW_API_URL=http://dotenv/api\n").unwrap();
        dealflow(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("http://dotenv/api"));
    }

    #[test]
    fn test_config_validate_defaults() {
        let dir = create_temp_project();
        dealflow(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_validate_reports_problems() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".dealflow")).unwrap();
        fs::write(
            dir.path().join(".dealflow/dealflow.toml"),
            "[api]\nbase_url = \"crm.internal\"\ntimeout_secs = 0\n",
        )
        .unwrap();

        dealflow(&dir)
            .args(["config", "validate"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Configuration warnings:"))
            .stdout(predicate::str::contains("timeout_secs"));
    }

    #[test]
    fn test_config_invalid_toml_fails() {
        let dir = create_temp_project();
        fs::create_dir_all(dir.path().join(".dealflow")).unwrap();
        fs::write(dir.path().join(".dealflow/dealflow.toml"), "[api\n").unwrap();
        dealflow(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to parse dealflow.toml"));
    }
}

// =============================================================================
// Offline behaviour
// =============================================================================

mod offline {
    use super::*;

    // Nothing listens on the discard port.
    const DEAD_URL: &str = "http://127.0.0.1:9/api";

    #[test]
    fn test_board_reports_unreachable_service() {
        let dir = create_temp_project();
        dealflow(&dir)
            .args(["--api-url", DEAD_URL, "board"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to load deals"));
        assert!(!dir.path().join(".dealflow").exists());
    }

    #[test]
    fn test_create_client_validates_before_network() {
        let dir = create_temp_project();
        dealflow(&dir)
            .args(["--api-url", DEAD_URL, "clients", "create", "--company", "Acme"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("contact_name, email"))
            .stderr(predicate::str::contains("Failed to load clients").not());
    }

    #[test]
    fn test_deal_create_missing_fields() {
        let dir = create_temp_project();
        dealflow(&dir)
            .args(["--api-url", DEAD_URL, "deals", "create", "--value", "100"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Please fill in all required fields"));
    }

    #[test]
    fn test_logout_without_session() {
        let dir = create_temp_project();
        dealflow(&dir)
            .args(["--api-url", DEAD_URL, "logout"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Signed out."));
    }
}

// =============================================================================
// Against a stub service
// =============================================================================

mod with_service {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::get,
    };
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Stub {
        reject_moves: bool,
        expired: bool,
        moves: Mutex<Vec<(i64, Value)>>,
        client_updates: Mutex<Vec<(i64, Value)>>,
    }

    fn deal(id: i64, stage: &str, value: &str) -> Value {
        json!({
            "id": id, "client_id": 1, "sales_rep_id": 2, "stage": stage,
            "estimated_value": value, "probability": 0.4,
            "created_at": "2024-01-01T09:00:00", "client_company": "Acme"
        })
    }

    async fn list_deals(
        State(stub): State<Arc<Stub>>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<Value>) {
        if stub.expired || headers.get("authorization").is_none() {
            return (StatusCode::UNAUTHORIZED, Json(json!({"error": "Token expired"})));
        }
        (
            StatusCode::OK,
            Json(json!({"deals": [deal(1, "Lead", "1000.00"), deal(2, "Contract", "2500.00")]})),
        )
    }

    async fn update_deal(
        State(stub): State<Arc<Stub>>,
        Path(id): Path<i64>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        stub.moves.lock().unwrap().push((id, body.clone()));
        if stub.reject_moves {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({})));
        }
        let stage = body["stage"].as_str().unwrap_or("Lead").to_string();
        (StatusCode::OK, Json(json!({"deal": deal(id, &stage, "1000.00")})))
    }

    async fn history(Path(id): Path<i64>) -> Json<Value> {
        Json(json!({"stage_history": [
            {"id": id, "deal_id": id, "stage": "Lead",
             "entered_at": "2024-01-01T00:00:00", "exited_at": "2024-01-03T00:00:00"}
        ]}))
    }

    async fn payments(Path(id): Path<i64>) -> Json<Value> {
        let milestones = if id == 1 {
            json!([{
                "id": 1, "deal_id": 1, "milestone_name": "Deposit", "amount_due": "400.00",
                "due_date": "2024-02-01", "status": "paid", "paid_on": "2024-02-01"
            }])
        } else {
            json!([])
        };
        Json(json!({"payment_schedules": milestones}))
    }

    async fn get_client(Path(id): Path<i64>) -> Json<Value> {
        Json(json!({"client": {
            "id": id, "company": "Acme", "contact_name": "Road Runner",
            "email": "rr@acme.test", "phone": "555-0100"
        }}))
    }

    async fn update_client(
        State(stub): State<Arc<Stub>>,
        Path(id): Path<i64>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        stub.client_updates.lock().unwrap().push((id, body));
        Json(json!({"message": "Client updated successfully"}))
    }

    /// Serve the stub on an ephemeral port; the runtime must outlive the test.
    fn serve(stub: Arc<Stub>) -> (tokio::runtime::Runtime, String) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let listener = rt
            .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
            .unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/api/deals", get(list_deals))
            .route("/api/deals/{id}", axum::routing::put(update_deal))
            .route("/api/deals/{id}/stage_history", get(history))
            .route("/api/deals/{id}/payment_schedules", get(payments))
            .route(
                "/api/clients/{id}",
                get(get_client).put(update_client),
            )
            .with_state(stub);
        rt.spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (rt, format!("http://{}/api", addr))
    }

    #[test]
    fn test_board_renders_columns() {
        let dir = create_temp_project();
        write_session(&dir, "tok");
        let (_rt, url) = serve(Arc::new(Stub::default()));

        dealflow(&dir)
            .args(["--api-url", &url, "board"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Lead (1) $1,000.00"))
            .stdout(predicate::str::contains("Contract (1) $2,500.00"))
            .stdout(predicate::str::contains("Final Payment (0)"));
    }

    #[test]
    fn test_move_sends_stage_only() {
        let dir = create_temp_project();
        write_session(&dir, "tok");
        let stub = Arc::new(Stub::default());
        let (_rt, url) = serve(stub.clone());

        dealflow(&dir)
            .args(["--api-url", &url, "move", "1", "column-Proposal"])
            .assert()
            .success();

        let moves = stub.moves.lock().unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0], (1, json!({"stage": "Proposal"})));
    }

    #[test]
    fn test_move_onto_card_uses_its_stage() {
        let dir = create_temp_project();
        write_session(&dir, "tok");
        let stub = Arc::new(Stub::default());
        let (_rt, url) = serve(stub.clone());

        dealflow(&dir)
            .args(["--api-url", &url, "move", "1", "deal-2"])
            .assert()
            .success();
        assert_eq!(stub.moves.lock().unwrap()[0].1, json!({"stage": "Contract"}));
    }

    #[test]
    fn test_move_to_same_stage_sends_nothing() {
        let dir = create_temp_project();
        write_session(&dir, "tok");
        let stub = Arc::new(Stub::default());
        let (_rt, url) = serve(stub.clone());

        dealflow(&dir)
            .args(["--api-url", &url, "move", "1", "Lead"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already in that stage"));
        assert!(stub.moves.lock().unwrap().is_empty());
    }

    #[test]
    fn test_rejected_move_rolls_back() {
        let dir = create_temp_project();
        write_session(&dir, "tok");
        let (_rt, url) = serve(Arc::new(Stub {
            reject_moves: true,
            ..Default::default()
        }));

        dealflow(&dir)
            .args(["--api-url", &url, "move", "1", "Proposal"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("deal-1 remains in Lead."))
            .stderr(predicate::str::contains("Failed to move deal. Please try again."));
    }

    #[test]
    fn test_expired_session_points_to_login_and_clears_token() {
        let dir = create_temp_project();
        write_session(&dir, "stale");
        let (_rt, url) = serve(Arc::new(Stub {
            expired: true,
            ..Default::default()
        }));

        dealflow(&dir)
            .args(["--api-url", &url, "board"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("dealflow login"));
        assert!(!dir.path().join(".dealflow/session.json").exists());
    }

    #[test]
    fn test_stats_from_service() {
        let dir = create_temp_project();
        write_session(&dir, "tok");
        let (_rt, url) = serve(Arc::new(Stub::default()));

        dealflow(&dir)
            .args(["--api-url", &url, "stats"])
            .assert()
            .success()
            .stdout(predicate::str::contains("$3,500.00"))
            .stdout(predicate::str::contains("Contracted value"))
            .stdout(predicate::str::contains("2.0 days"));
    }

    #[test]
    fn test_deals_list_shows_paid_and_outstanding() {
        let dir = create_temp_project();
        write_session(&dir, "tok");
        let (_rt, url) = serve(Arc::new(Stub::default()));

        dealflow(&dir)
            .args(["--api-url", &url, "deals", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Outstanding"))
            .stdout(predicate::str::contains("$400.00"))
            .stdout(predicate::str::contains("$600.00"))
            .stdout(predicate::str::contains("$2,500.00"));
    }

    #[test]
    fn test_deal_update_sends_given_fields() {
        let dir = create_temp_project();
        write_session(&dir, "tok");
        let stub = Arc::new(Stub::default());
        let (_rt, url) = serve(stub.clone());

        dealflow(&dir)
            .args([
                "--api-url", &url, "deals", "update", "2", "--value", "3000", "--won-on",
                "2024-05-01",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains("Updated deal-2"));

        let updates = stub.moves.lock().unwrap();
        assert_eq!(
            updates[0],
            (2, json!({"estimated_value": "3000.00", "won_on": "2024-05-01"}))
        );
    }

    #[test]
    fn test_deal_update_without_fields_sends_nothing() {
        let dir = create_temp_project();
        write_session(&dir, "tok");
        let stub = Arc::new(Stub::default());
        let (_rt, url) = serve(stub.clone());

        dealflow(&dir)
            .args(["--api-url", &url, "deals", "update", "2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("nothing to update"));
        assert!(stub.moves.lock().unwrap().is_empty());
    }

    #[test]
    fn test_client_update_sends_partial_body() {
        let dir = create_temp_project();
        write_session(&dir, "tok");
        let stub = Arc::new(Stub::default());
        let (_rt, url) = serve(stub.clone());

        dealflow(&dir)
            .args(["--api-url", &url, "clients", "update", "5", "--phone", "555-0100"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Updated client 5"))
            .stdout(predicate::str::contains("Acme"));

        let updates = stub.client_updates.lock().unwrap();
        assert_eq!(updates[0], (5, json!({"phone": "555-0100"})));
    }
}
