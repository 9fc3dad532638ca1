//! A canned upstream server that counts hits per URI.

use axum::extract::State;
use axum::http::header::{HeaderName, CONTENT_TYPE};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A canned response served for one path.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct CannedResponse {
    pub body: String,
    pub content_type: Option<String>,
    pub extra_headers: Vec<(String, String)>,
    /// Artificial response delay, to widen race windows in
    /// concurrency tests.
    pub delay_ms: u64,
}

#[allow(dead_code)]
impl CannedResponse {
    pub fn text(body: &str) -> Self {
        Self {
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn html(body: &str) -> Self {
        Self {
            body: body.to_string(),
            content_type: Some("text/html".to_string()),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.extra_headers
            .push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }
}

#[derive(Clone)]
struct UpstreamState {
    hits: Arc<Mutex<HashMap<String, usize>>>,
    responses: Arc<HashMap<String, CannedResponse>>,
}

async fn upstream_handler(State(state): State<UpstreamState>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    *state
        .hits
        .lock()
        .unwrap()
        .entry(path.clone())
        .or_insert(0) += 1;

    let Some(canned) = state.responses.get(&path).cloned() else {
        return (StatusCode::NOT_FOUND, format!("URI {path} is invalid.")).into_response();
    };

    if canned.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(canned.delay_ms)).await;
    }

    let mut response = (StatusCode::OK, canned.body).into_response();
    if let Some(content_type) = &canned.content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, content_type.parse().unwrap());
    }
    for (name, value) in &canned.extra_headers {
        response.headers_mut().append(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            value.parse().unwrap(),
        );
    }
    response
}

/// The upstream origin under test: serves canned bodies and records how
/// many times each URI was fetched.
#[allow(dead_code)]
pub struct Upstream {
    pub addr: SocketAddr,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

#[allow(dead_code)]
impl Upstream {
    pub async fn start(routes: Vec<(&str, CannedResponse)>) -> Self {
        let hits = Arc::new(Mutex::new(HashMap::new()));
        let responses = Arc::new(
            routes
                .into_iter()
                .map(|(path, canned)| (path.to_string(), canned))
                .collect::<HashMap<_, _>>(),
        );
        let state = UpstreamState {
            hits: hits.clone(),
            responses,
        };
        let app = Router::new().fallback(upstream_handler).with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind upstream listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("upstream exited");
        });

        Self { addr, hits }
    }

    /// Absolute source URL for a path on this upstream.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of times a path has been fetched.
    pub fn hits(&self, path: &str) -> usize {
        *self.hits.lock().unwrap().get(path).unwrap_or(&0)
    }
}
