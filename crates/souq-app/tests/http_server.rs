//! Serves the API on a loopback port and runs the smoke suite against it

use tokio::sync::oneshot;

use souq_app::config::Config;
use souq_app::http::{build_pipeline, AppState, Server, TokenIssuer};
use souq_app::smoke::SmokeRunner;
use souq_infra::{reference_prices, Repositories};

async fn start_server(issuer: &TokenIssuer) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let repos = Repositories::in_memory(reference_prices::builtin().unwrap()).unwrap();
    let state = AppState::new(repos, &Config::default());
    let server = Server::bind("127.0.0.1:0", state, build_pipeline(issuer.clone()))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .run(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    (format!("http://{}", addr), tx, handle)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_smoke_suite_passes_against_live_server() {
    let issuer = TokenIssuer::new("server-test-secret", None);
    let (base_url, shutdown, handle) = start_server(&issuer).await;

    let runner = SmokeRunner::new(&base_url, &issuer).unwrap();
    let report = runner.run(None).await;

    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter(|o| !o.passed)
        .map(|o| format!("{}: {}", o.name, o.detail))
        .collect();
    assert!(failures.is_empty(), "{:#?}", failures);
    assert_eq!(report.passed(), SmokeRunner::scenario_count());

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_smoke_detects_foreign_secret() {
    let server_issuer = TokenIssuer::new("server-test-secret", None);
    let (base_url, shutdown, handle) = start_server(&server_issuer).await;

    let runner = SmokeRunner::new(&base_url, &TokenIssuer::new("wrong-secret", None)).unwrap();
    let report = runner.run(None).await;
    assert!(!report.all_passed());
    // Public and anonymous scenarios are unaffected by the secret
    assert!(report.outcomes.iter().take(4).all(|o| o.passed));

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}
