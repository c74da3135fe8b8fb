//! Shared setup for the browser suites

use loginlab_common::Locale;
use loginlab_e2e::server::{default_binary_path, ServerConfig, ServerHandle};
use loginlab_e2e::{login_scenarios, SpecExecutor, TestRunner};

/// Spawn the server, or `None` when the binary has not been built
pub async fn start_server(locale: Locale) -> Option<ServerHandle> {
    let binary_path = default_binary_path();
    if !binary_path.exists() {
        eprintln!(
            "skipping: {} not found (run `cargo build -p loginlab-web`)",
            binary_path.display()
        );
        return None;
    }

    let config = ServerConfig {
        binary_path,
        locale,
        ..Default::default()
    };
    Some(ServerHandle::spawn(config).await.expect("server should start"))
}

/// Run every login scenario for `locale` and fail with the step log of each
/// failing one
pub async fn run_login_contract(executor: &dyn SpecExecutor, locale: Locale) {
    let specs = login_scenarios(locale);
    let suite = TestRunner::execute_specs(executor, &specs).await;

    assert_eq!(suite.total, specs.len());
    let failures: Vec<String> = suite
        .results
        .iter()
        .filter(|r| !r.success)
        .map(|r| format!("{}: {:?}\nsteps: {:#?}", r.name, r.error, r.steps))
        .collect();
    assert!(
        failures.is_empty(),
        "{} ({}):\n{}",
        suite.summary(),
        locale,
        failures.join("\n")
    );
}
