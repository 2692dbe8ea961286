//! Local stand-ins for the recipe and chat-completion APIs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub query: String,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    routes: HashMap<String, (StatusCode, String)>,
    hits: Vec<Hit>,
}

/// Answers canned bodies per path and records every request.
#[derive(Clone, Default)]
pub struct FakeApi {
    inner: Arc<Mutex<Inner>>,
}

impl FakeApi {
    pub fn respond(&self, path: &str, body: Value) {
        self.respond_raw(path, &body.to_string());
    }

    pub fn respond_raw(&self, path: &str, body: &str) {
        self.inner
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), (StatusCode::OK, body.to_string()));
    }

    pub fn fail(&self, path: &str, status: u16) {
        let status = StatusCode::from_u16(status).unwrap();
        self.inner
            .lock()
            .unwrap()
            .routes
            .insert(path.to_string(), (status, String::new()));
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.inner.lock().unwrap().hits.clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.hits().into_iter().map(|hit| hit.query).collect()
    }

    pub fn router(&self) -> Router {
        Router::new().fallback(handle).with_state(self.clone())
    }
}

async fn handle(State(api): State<FakeApi>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let mut inner = api.inner.lock().unwrap();
    inner.hits.push(Hit {
        path: uri.path().to_string(),
        query: uri.query().unwrap_or_default().to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: body.to_vec(),
    });
    match inner.routes.get(uri.path()) {
        Some((status, body)) => (*status, body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
