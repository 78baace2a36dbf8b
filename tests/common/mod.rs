//! Mock islands served by axum on ephemeral ports, speaking the same HTTP/JSON
//! contract as the real optimizer workers.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MockState {
    /// Init calls answered with 503 before the island comes up.
    pub init_failures_left: usize,
    pub init_calls: usize,
    pub initialized: bool,
    pub generations_advanced: usize,
    pub evolve_queries: Vec<usize>,
    /// One value consumed per evolve call; the last one repeats.
    pub fitness_script: VecDeque<f64>,
    pub best: f64,
    /// Replaces the evolve answer wholesale (status code, raw body).
    pub evolve_override: Option<(u16, String)>,
    pub evolve_delay: Option<Duration>,
    /// What `GET /migrants` returns, as raw JSON.
    pub outgoing_migrants: Value,
    /// Every body received on `POST /migrants`.
    pub received_migrants: Vec<Value>,
    pub status_fails: bool,
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct MockIsland {
    pub url: String,
    pub state: Shared,
}

impl MockIsland {
    pub fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[derive(Deserialize)]
struct EvolveParams {
    generations: usize,
}

async fn init(State(state): State<Shared>) -> Response {
    let mut state = state.lock().unwrap();
    state.init_calls += 1;
    if state.init_failures_left > 0 {
        state.init_failures_left -= 1;
        return (StatusCode::SERVICE_UNAVAILABLE, "starting up").into_response();
    }
    state.initialized = true;
    Json(json!({"status": "initialized", "assets": 10})).into_response()
}

async fn evolve(State(state): State<Shared>, Query(params): Query<EvolveParams>) -> Response {
    let delay = state.lock().unwrap().evolve_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut state = state.lock().unwrap();
    if let Some((code, body)) = state.evolve_override.clone() {
        return (StatusCode::from_u16(code).unwrap(), body).into_response();
    }
    if !state.initialized {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "Not initialized"})))
            .into_response();
    }
    state.generations_advanced += params.generations;
    state.evolve_queries.push(params.generations);
    let fitness = if state.fitness_script.len() > 1 {
        state.fitness_script.pop_front().unwrap()
    } else {
        state.fitness_script.front().copied().unwrap_or(0.0)
    };
    state.best = state.best.max(fitness);
    Json(json!({"status": "evolved", "current_best_sharpe": fitness})).into_response()
}

async fn get_migrants(State(state): State<Shared>) -> Response {
    let state = state.lock().unwrap();
    Json(state.outgoing_migrants.clone()).into_response()
}

async fn post_migrants(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut state = state.lock().unwrap();
    let count = body["genes"].as_array().map_or(0, Vec::len);
    state.received_migrants.push(body);
    Json(json!({"status": "migrants_integrated", "count": count})).into_response()
}

async fn status(State(state): State<Shared>) -> Response {
    let state = state.lock().unwrap();
    if state.status_fails {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(json!({"sharpe": state.best})).into_response()
}

pub async fn spawn_island(state: MockState) -> MockIsland {
    let state: Shared = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/init", post(init))
        .route("/evolve", post(evolve))
        .route("/migrants", get(get_migrants).post(post_migrants))
        .route("/status", get(status))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockIsland {
        url: format!("http://{address}"),
        state,
    }
}

/// An address nothing listens on.
pub async fn dead_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{address}")
}

pub fn scripted(fitness: &[f64], genes: Value) -> MockState {
    MockState {
        fitness_script: fitness.iter().copied().collect(),
        best: f64::MIN,
        outgoing_migrants: genes,
        ..Default::default()
    }
}
