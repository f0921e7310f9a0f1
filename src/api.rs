use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Json, Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    app_state::AppState,
    error::AppError,
    ingest::{self, ExtractedDocument, UploadStaging, MAX_FILES, MAX_FILE_BYTES},
    models::{Graph, GraphData},
    rag,
    sample::{self, SamplePreset},
    synthesis,
};

/// Límite del cuerpo de `/analyze`: el tope real lo marca cada fichero.
const ANALYZE_BODY_LIMIT: usize = MAX_FILES * MAX_FILE_BYTES + 1024 * 1024;

const DEFAULT_SEED: i64 = 42;

// --- Payloads y Respuestas de la API ---

#[derive(Debug, Deserialize)]
pub struct SampleQuery {
    size: Option<String>,
    seed: Option<i64>,
    clusters: Option<usize>,
    concepts: Option<usize>,
    link_prob: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AskPayload {
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    graph: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    answer: String,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/debug/env", get(debug_env_handler))
        .route("/sample", get(sample_handler))
        .route(
            "/analyze",
            post(analyze_handler).layer(DefaultBodyLimit::max(ANALYZE_BODY_LIMIT)),
        )
        .route("/ask", post(ask_handler))
        .with_state(app_state)
}

// --- Handlers ---

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Indica si hay configuración, nunca su valor.
async fn debug_env_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "BLACKBOX_API_KEY_present": state.config.api_key.is_some(),
        "BLACKBOX_MODEL": state.config.forced_model,
    }))
}

#[axum::debug_handler]
async fn sample_handler(Query(params): Query<SampleQuery>) -> Json<GraphData> {
    let preset = SamplePreset::for_size(params.size.as_deref().unwrap_or("small"));
    // 0 equivale a "no indicado": se usa el valor del preset.
    let n = params.clusters.filter(|n| *n > 0).unwrap_or(preset.clusters);
    let c = params.concepts.filter(|c| *c > 0).unwrap_or(preset.concepts);
    let p = params.link_prob.unwrap_or(preset.link_prob);
    let seed = params.seed.unwrap_or(DEFAULT_SEED);

    let graph = sample::build_sample_graph(n, c, p, seed);
    info!(
        "Grafo de ejemplo generado: {} clusters, {} enlaces (seed={})",
        graph.clusters.len(),
        graph.links.len(),
        seed
    );
    Json(graph)
}

#[axum::debug_handler]
async fn analyze_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Graph>, AppError> {
    // Se elimina al salir del handler, también si hay error.
    let staging = UploadStaging::new()?;
    debug!("Directorio temporal de subida: {}", staging.path().display());
    let mut docs: Vec<ExtractedDocument> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.file_name().is_none() && field.name() != Some("files") {
            continue;
        }
        if docs.len() >= MAX_FILES {
            return Err(AppError::upload(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Demasiados ficheros (máximo {MAX_FILES})"),
            ));
        }

        let filename = field.file_name().map(str::to_string);
        let declared = field.content_type().map(str::to_string);
        let name = ingest::safe_file_name(filename.as_deref());

        let data = read_limited(field, &name).await?;
        let path = staging.store(filename.as_deref(), &data)?;
        let text = ingest::extract_text_blocking(path, declared).await;
        info!("Fichero {} recibido ({} bytes)", name, data.len());
        docs.push(ExtractedDocument { name, text });
    }

    if docs.is_empty() {
        return Err(AppError::upload(
            StatusCode::BAD_REQUEST,
            "No se subieron ficheros",
        ));
    }

    let corpus = ingest::build_corpus(&docs);
    let graph = synthesis::build_graph(&state.chat, &[corpus]).await?;
    Ok(Json(graph))
}

#[axum::debug_handler]
async fn ask_handler(
    State(state): State<AppState>,
    Json(payload): Json<AskPayload>,
) -> Result<Json<AskResponse>, AppError> {
    let question = payload.question.as_deref().map(str::trim).unwrap_or_default();
    if question.is_empty() {
        return Err(AppError::Validation("Falta la pregunta".to_string()));
    }
    let graph = payload.graph.unwrap_or_else(|| json!({}));

    let answer = rag::answer_question(&state.chat, question, &graph).await?;
    Ok(Json(AskResponse { answer }))
}

// --- Utilidades ---

/// Lee un campo completo cortando en cuanto supera el límite por fichero.
async fn read_limited(mut field: Field<'_>, name: &str) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        if data.len() + chunk.len() > MAX_FILE_BYTES {
            return Err(AppError::upload(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("{name} supera el límite de 20MB"),
            ));
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::upload(err.status(), err.body_text())
}
