//! Shared utilities for integration tests.

use formforge::config::{FormConfig, FormforgeConfig};
use formforge::http::HttpServer;
use formforge::lifecycle::Shutdown;
use formforge::storage::Repository;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const ADMIN_KEY: &str = "integration-admin-key";

/// A server running on an ephemeral port.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub admin_addr: Option<SocketAddr>,
    pub repository: Arc<dyn Repository>,
    pub shutdown: Shutdown,
    pub reload: mpsc::UnboundedSender<FormforgeConfig>,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn admin_url(&self, path: &str) -> String {
        let addr = self.admin_addr.expect("admin API not enabled");
        format!("http://{addr}{path}")
    }

    /// Trigger shutdown and wait for the server task to finish.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}

#[allow(dead_code)]
pub fn form(public_id: &str, allowed_origins: &str) -> FormConfig {
    FormConfig {
        public_id: public_id.to_string(),
        name: format!("Form {public_id}"),
        allowed_origins: allowed_origins.to_string(),
        ..FormConfig::default()
    }
}

/// Configuration with a permissive and a restricted form seeded.
#[allow(dead_code)]
pub fn test_config() -> FormforgeConfig {
    let mut config = FormforgeConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.forms.push(form("open", "*"));
    config.forms.push(form("restricted", "https://a.example, https://b.example"));
    config
}

/// Reserve a free local port for a listener the server binds itself.
#[allow(dead_code)]
pub fn free_port_addr() -> SocketAddr {
    let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    reserved.local_addr().unwrap()
}

/// Start the server; when the admin API is enabled, wait until it answers.
#[allow(dead_code)]
pub async fn start_server(mut config: FormforgeConfig) -> TestServer {
    let admin_addr = if config.admin.enabled {
        let addr = free_port_addr();
        config.admin.bind_address = addr.to_string();
        config.admin.api_key = ADMIN_KEY.to_string();
        Some(addr)
    } else {
        None
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let repository = server.state().repository.clone();

    let shutdown = Shutdown::new();
    let (reload, updates) = mpsc::unbounded_channel();
    let handle = tokio::spawn(server.run(listener, updates, shutdown.subscribe()));

    if let Some(admin) = admin_addr {
        let client = reqwest::Client::new();
        let mut ready = false;
        for _ in 0..100 {
            let response = client
                .get(format!("http://{admin}/admin/status"))
                .bearer_auth(ADMIN_KEY)
                .send()
                .await;
            if response.is_ok() {
                ready = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(ready, "admin API never became ready");
    }

    TestServer {
        addr,
        admin_addr,
        repository,
        shutdown,
        reload,
        handle,
    }
}

/// A client that does not follow redirects.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
