//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

use request_memory_observer::config::ObserverConfig;
use request_memory_observer::{HttpServer, Shutdown};

/// A demo server running on an ephemeral port with its logs in a temp dir.
pub struct TestServer {
    pub addr: SocketAddr,
    pub telemetry_log: PathBuf,
    pub identity_log: PathBuf,
    pub shutdown: Shutdown,
    _dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Parsed telemetry lines written so far.
    pub fn records(&self) -> Vec<serde_json::Value> {
        read_records(&self.telemetry_log)
    }
}

/// Start the demo server. `configure` adjusts the observer config after the
/// temp-dir paths are filled in.
pub async fn start_server(configure: impl FnOnce(&mut ObserverConfig)) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    let telemetry_log = dir.path().join("log/memory_tracker.log");
    let identity_log = dir.path().join("log/development.log");

    let mut config = ObserverConfig {
        log_destination: telemetry_log.clone(),
        identity_log: Some(identity_log.clone()),
        ..Default::default()
    };
    configure(&mut config);

    let server = HttpServer::from_config(&config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut shutdown = Shutdown::new();
    shutdown.flush_on_exit(server.sink());
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        telemetry_log,
        identity_log,
        shutdown,
        _dir: dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Every line must be a standalone JSON object.
pub fn read_records(path: &Path) -> Vec<serde_json::Value> {
    let contents = std::fs::read_to_string(path).unwrap_or_default();
    contents
        .lines()
        .map(|line| {
            serde_json::from_str(line).unwrap_or_else(|e| panic!("malformed line {line:?}: {e}"))
        })
        .collect()
}
