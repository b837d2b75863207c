use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::cli::ServeArgs;
use crate::dashboard::{refresh_selection, selection_options, visualize};
use crate::hospitals::hospital_detail;
use crate::lookup::SelectionMode;
use crate::storage::StoragePaths;
use crate::store::{DatasetCounts, ReferenceStore};
use crate::visible::{SchemaField, VISIBLE_ROW_SCHEMA};

#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<ReferenceStore>>,
    counts: DatasetCounts,
}

impl AppState {
    pub fn new(store: ReferenceStore) -> Self {
        let counts = store.counts().clone();
        Self {
            store: Arc::new(Mutex::new(store)),
            counts,
        }
    }
}

pub async fn run(opts: ServeArgs) -> anyhow::Result<()> {
    let paths = StoragePaths::new(&opts.data_dir);
    let store = ReferenceStore::open(&paths)
        .with_context(|| format!("load datasets from {}", paths.data_dir.display()))?;

    let app = router(AppState::new(store));

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .context("parse host:port")?;

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/stats", get(api_stats))
        .route("/api/options", get(api_options))
        .route("/api/selection", get(api_selection))
        .route("/api/visualizations", post(api_visualizations))
        .route("/api/hospitals/:unique_id", get(api_hospital_detail))
        .route("/api/schema", get(api_schema))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    datasets: DatasetCounts,
}

async fn api_stats(State(st): State<AppState>) -> impl IntoResponse {
    Json(StatsResponse {
        datasets: st.counts,
    })
}

#[derive(Debug, Deserialize)]
struct OptionsParams {
    mode: String,
}

async fn api_options(
    State(st): State<AppState>,
    Query(p): Query<OptionsParams>,
) -> impl IntoResponse {
    let Some(mode) = SelectionMode::parse(&p.mode) else {
        return (
            StatusCode::BAD_REQUEST,
            format!("mode must be 'hcpcs' or 'ndc', got '{}'", p.mode),
        )
            .into_response();
    };
    let store = st.store.lock().await;
    Json(selection_options(&store, mode)).into_response()
}

#[derive(Debug, Deserialize)]
struct SelectionParams {
    mode: String,
    selection: Option<String>,
}

async fn api_selection(
    State(st): State<AppState>,
    Query(p): Query<SelectionParams>,
) -> impl IntoResponse {
    let store = st.store.lock().await;
    Json(refresh_selection(&store, &p.mode, p.selection.as_deref()))
}

#[derive(Debug, Deserialize)]
struct VisualizationRequest {
    #[serde(default)]
    rows: Vec<Value>,
}

async fn api_visualizations(
    State(st): State<AppState>,
    Json(req): Json<VisualizationRequest>,
) -> impl IntoResponse {
    let store = st.store.lock().await;
    match visualize(&store, &req.rows) {
        Some(v) => Json(v).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn api_hospital_detail(
    State(st): State<AppState>,
    AxumPath(unique_id): AxumPath<String>,
) -> impl IntoResponse {
    let store = st.store.lock().await;
    match hospital_detail(&store, &unique_id) {
        Ok(Some(h)) => Json(h).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            format!("no hospital with unique_id '{unique_id}'"),
        )
            .into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    }
}

async fn api_schema() -> Json<&'static [SchemaField]> {
    Json(VISIBLE_ROW_SCHEMA)
}
