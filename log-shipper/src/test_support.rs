//! In-process stand-in for the ingestion server, used by unit tests.

use crate::config::Config;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One multipart submission as seen by the server.
#[derive(Debug, Clone, Default)]
pub struct Received {
    pub secret: String,
    pub file_name: String,
    pub body: Vec<u8>,
}

struct ServerState {
    default_status: u16,
    statuses: HashMap<String, u16>,
    received: Mutex<Vec<Received>>,
}

pub struct TestServerBuilder {
    default_status: u16,
    statuses: HashMap<String, u16>,
}

impl TestServerBuilder {
    /// Respond to uploads of `file_name` with `status`.
    pub fn with_status(mut self, file_name: &str, status: u16) -> Self {
        self.statuses.insert(file_name.to_string(), status);
        self
    }

    pub fn default_status(mut self, status: u16) -> Self {
        self.default_status = status;
        self
    }

    pub async fn spawn(self) -> TestServer {
        let state = Arc::new(ServerState {
            default_status: self.default_status,
            statuses: self.statuses,
            received: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/logs/", post(receive_log))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer { addr, state }
    }
}

pub struct TestServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl TestServer {
    /// Server answering 201 unless told otherwise.
    pub fn start() -> TestServerBuilder {
        TestServerBuilder {
            default_status: 201,
            statuses: HashMap::new(),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn received(&self) -> Vec<Received> {
        self.state.received.lock().unwrap().clone()
    }

    /// File names received so far, sorted.
    pub fn received_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.received().into_iter().map(|r| r.file_name).collect();
        names.sort();
        names
    }

    /// Poll until at least `count` uploads arrived or `timeout` elapses.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.received().len() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.received().len() >= count
    }
}

async fn receive_log(State(state): State<Arc<ServerState>>, mut multipart: Multipart) -> StatusCode {
    let mut received = Received::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "secret" => received.secret = field.text().await.unwrap_or_default(),
            "log" => {
                received.file_name = field.file_name().unwrap_or_default().to_string();
                received.body = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            }
            _ => {}
        }
    }

    let status = state
        .statuses
        .get(&received.file_name)
        .copied()
        .unwrap_or(state.default_status);
    state.received.lock().unwrap().push(received);

    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn test_config(api_host: &str) -> Config {
    Config {
        api_host: api_host.to_string(),
        api_secret: "s3cret".to_string(),
        request_timeout: Duration::from_secs(5),
        log_level: "debug".to_string(),
    }
}
