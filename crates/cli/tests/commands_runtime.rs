use std::env;
use std::sync::{mpsc, Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use fleetgate_cli::commands::remote::ApiTarget;
use fleetgate_cli::commands::{config, decide, doctor, migrate, pending, seed};
use fleetgate_client::ApprovalClient;
use fleetgate_core::approvals::ApprovalAction;
use fleetgate_core::audit::InMemoryAuditSink;
use fleetgate_core::config::AppConfig;
use fleetgate_core::security::hash_password_with;
use fleetgate_db::repositories::{
    InMemoryBookingRepository, InMemoryUserRepository, InMemoryVehicleRepository,
};
use fleetgate_db::{DemoSeedDataset, SeedTargets};
use fleetgate_server::{serve, AppState, Repositories};
use serde_json::Value;

const SECRET: &str = "cli-runtime-test-secret-0123";

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(
        &[
            ("FLEETGATE_DATABASE_URL", "sqlite::memory:"),
            ("FLEETGATE_DATABASE_MAX_CONNECTIONS", "1"),
            ("FLEETGATE_AUTH_JWT_SECRET", SECRET),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 0, "expected successful migrate run: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
            assert_eq!(payload["data"]["applied_versions"], serde_json::json!([1, 2]));
        },
    );
}

#[test]
fn migrate_returns_config_failure_without_signing_secret() {
    with_env(&[("FLEETGATE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_against_a_file_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("fleet.db").display());

    with_env(&[("FLEETGATE_DATABASE_URL", &url), ("FLEETGATE_AUTH_JWT_SECRET", SECRET)], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "first seed: {}", first.output);
        let payload = parse_payload(&first.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["data"]["users_created"], 3);
        assert_eq!(payload["data"]["vehicles_created"], 4);
        assert_eq!(payload["data"]["bookings_created"], 4);

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "second seed: {}", second.output);
        let payload = parse_payload(&second.output);
        assert_eq!(payload["message"], "demo dataset already present; nothing to add");
    });
}

#[test]
fn config_output_redacts_the_signing_secret_and_names_sources() {
    with_env(
        &[
            ("FLEETGATE_AUTH_JWT_SECRET", SECRET),
            ("FLEETGATE_WORKFLOW_ADMIN_OVERRIDE", "true"),
            ("FLEETGATE_LOG_LEVEL", "debug"),
        ],
        || {
            let output = config::run();
            assert!(!output.contains(SECRET), "secret leaked: {output}");
            assert!(output.contains("auth.jwt_secret = <redacted"));
            assert!(output.contains(
                "workflow.admin_override = true (source: env (FLEETGATE_WORKFLOW_ADMIN_OVERRIDE))"
            ));
            assert!(output.contains("logging.level = debug (source: env (FLEETGATE_LOG_LEVEL))"));
        },
    );
}

#[test]
fn doctor_reports_unmigrated_schema_as_failure() {
    with_env(
        &[
            ("FLEETGATE_DATABASE_URL", "sqlite::memory:"),
            ("FLEETGATE_DATABASE_MAX_CONNECTIONS", "1"),
            ("FLEETGATE_AUTH_JWT_SECRET", SECRET),
        ],
        || {
            let (output, passed) = doctor::run(true);
            assert!(!passed);

            let report = parse_payload(&output);
            assert_eq!(report["overall_status"], "fail");
            let checks = report["checks"].as_array().expect("checks");
            let status_of = |name: &str| {
                checks
                    .iter()
                    .find(|check| check["name"] == name)
                    .map(|check| check["status"].clone())
                    .expect("check present")
            };
            assert_eq!(status_of("config_validation"), "pass");
            assert_eq!(status_of("database_connectivity"), "pass");
            assert_eq!(status_of("schema_version"), "fail");
        },
    );
}

#[test]
fn doctor_skips_database_checks_when_config_is_invalid() {
    with_env(&[], || {
        let (output, passed) = doctor::run(false);
        assert!(!passed);
        assert!(output.contains("[fail] config_validation"));
        assert!(output.contains("[skip] database_connectivity"));
    });
}

#[test]
fn pending_and_decide_drive_a_running_server() {
    let server = LoopbackServer::start();
    let approver1 = server.login("approver1", "approver123");
    let target = |token: &str| ApiTarget {
        url: server.base_url.clone(),
        token: Some(token.to_string()),
        timeout: Duration::from_secs(5),
    };

    let listed = pending::run(&target(&approver1), false);
    assert_eq!(listed.exit_code, 0, "{}", listed.output);
    let payload = parse_payload(&listed.output);
    let ids: Vec<i64> = payload["data"]
        .as_array()
        .expect("rows")
        .iter()
        .filter_map(|row| row["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![1]);

    let approved = decide::run(&target(&approver1), 1, ApprovalAction::Approve);
    assert_eq!(approved.exit_code, 0, "{}", approved.output);
    let payload = parse_payload(&approved.output);
    assert_eq!(payload["data"]["booking"]["status"], 1);
    assert_eq!(payload["data"]["pending"], serde_json::json!([]));

    let again = decide::run(&target(&approver1), 1, ApprovalAction::Reject);
    assert_eq!(again.exit_code, 7, "{}", again.output);
    assert_eq!(parse_payload(&again.output)["error_class"], "forbidden");

    let approver2 = server.login("approver2", "approver123");
    let terminal = decide::run(&target(&approver2), 3, ApprovalAction::Approve);
    assert_eq!(terminal.exit_code, 9, "{}", terminal.output);

    let not_admin = pending::run(&target(&approver2), true);
    assert_eq!(not_admin.exit_code, 7);

    let bogus = pending::run(&target("not-a-jwt"), false);
    assert_eq!(bogus.exit_code, 6);
}

#[test]
fn pending_requires_a_token() {
    let target = ApiTarget {
        url: "http://127.0.0.1:9".to_string(),
        token: None,
        timeout: Duration::from_secs(1),
    };
    let result = pending::run(&target, false);
    assert_eq!(result.exit_code, 2);
    assert_eq!(parse_payload(&result.output)["error_class"], "missing_token");
}

struct LoopbackServer {
    base_url: String,
    runtime: Arc<tokio::runtime::Runtime>,
    stop: Option<tokio::sync::oneshot::Sender<()>>,
}

impl LoopbackServer {
    /// Serves a seeded in-memory app from a runtime on its own thread so the
    /// commands under test can build their own runtimes.
    fn start() -> Self {
        let runtime = Arc::new(
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .enable_all()
                .build()
                .expect("server runtime"),
        );

        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let server_runtime = Arc::clone(&runtime);
        thread::spawn(move || {
            server_runtime.block_on(async move {
                let users = Arc::new(InMemoryUserRepository::default());
                let vehicles = Arc::new(InMemoryVehicleRepository::default());
                let bookings = Arc::new(InMemoryBookingRepository::default());
                DemoSeedDataset::load(
                    SeedTargets {
                        users: users.as_ref(),
                        vehicles: vehicles.as_ref(),
                        bookings: bookings.as_ref(),
                    },
                    |password| hash_password_with(password, 1).map_err(|error| error.to_string()),
                )
                .await
                .expect("seed");

                let mut config = AppConfig::default();
                config.auth.jwt_secret = SECRET.to_string().into();
                let state = AppState::with_repositories(
                    &config,
                    Repositories { bookings, users, vehicles },
                    Arc::new(InMemoryAuditSink::default()),
                    None,
                );

                let listener =
                    tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
                let address = listener.local_addr().expect("local addr");
                ready_tx.send(format!("http://{address}")).expect("report address");

                serve(
                    listener,
                    state,
                    async move {
                        let _ = stopped.await;
                    },
                    Duration::from_secs(1),
                )
                .await
                .expect("serve");
            });
        });

        let base_url = ready_rx.recv_timeout(Duration::from_secs(10)).expect("server ready");
        Self { base_url, runtime, stop: Some(stop) }
    }

    fn login(&self, username: &str, password: &str) -> String {
        self.runtime.block_on(async {
            let mut client =
                ApprovalClient::new(&self.base_url, Duration::from_secs(5)).expect("client");
            client.login(username, password).await.expect("login");
            client.token().map(str::to_string).expect("token stored")
        })
    }
}

impl Drop for LoopbackServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid json")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "FLEETGATE_DATABASE_URL",
        "FLEETGATE_DATABASE_MAX_CONNECTIONS",
        "FLEETGATE_DATABASE_TIMEOUT_SECS",
        "FLEETGATE_SERVER_BIND_ADDRESS",
        "FLEETGATE_SERVER_PORT",
        "FLEETGATE_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "FLEETGATE_AUTH_JWT_SECRET",
        "FLEETGATE_AUTH_TOKEN_TTL_SECS",
        "FLEETGATE_WORKFLOW_ALLOW_IDENTICAL_APPROVERS",
        "FLEETGATE_WORKFLOW_ADMIN_OVERRIDE",
        "FLEETGATE_LOGGING_LEVEL",
        "FLEETGATE_LOGGING_FORMAT",
        "FLEETGATE_LOG_LEVEL",
        "FLEETGATE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(test_fn));

    for (key, value) in previous_values {
        match value {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }

    if let Err(panic) = outcome {
        std::panic::resume_unwind(panic);
    }
}
