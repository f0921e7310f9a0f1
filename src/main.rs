// Módulos de la aplicación
mod api;
mod app_state;
mod config;
mod error;
mod ingest;
mod llm;
mod models;
mod rag;
mod sample;
mod synthesis;

use crate::{app_state::AppState, config::AppConfig};
use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 2. Cargar configuración (una sola vez; después es de sólo lectura)
    let cfg = AppConfig::from_env().context("Error al cargar la configuración")?;
    if cfg.api_key.is_none() {
        warn!("BLACKBOX_API_KEY no está definida: /analyze y /ask responderán con error.");
    }

    // 3. Estado compartido con el cliente de chat
    let app_state = AppState::from_config(cfg).context("Error inicializando el cliente de chat")?;
    info!("Modelos candidatos: {}", app_state.chat.models().join(", "));

    // 4. Router de la API con CORS y trazas por petición
    let cors = cors_layer(&app_state.config);
    let server_addr = app_state.config.server_addr.clone();
    let app = api::create_router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // 5. Iniciar el servidor
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    info!("🚀 InsightGraph API escuchando en http://{}", server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .context("Error en el servidor HTTP")?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}

/// Con `*` se acepta cualquier origen sin credenciales; con una lista
/// explícita se permiten credenciales y se reflejan métodos y cabeceras.
fn cors_layer(cfg: &AppConfig) -> CorsLayer {
    if cfg.allows_any_origin() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = cfg
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Origen CORS inválido ignorado: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use axum::{
        body::Body,
        http::{header, Method, Request},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    fn router_with(cfg: &AppConfig) -> Router {
        Router::new()
            .route("/ask", post(|| async { "ok" }))
            .layer(cors_layer(cfg))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/ask")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn wildcard_origin_allows_any_without_credentials() {
        let cfg = test_config("http://llm.test/v1", None);
        let response = router_with(&cfg)
            .oneshot(preflight("http://anywhere.test"))
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[tokio::test]
    async fn explicit_origins_are_echoed_with_credentials() {
        let mut cfg = test_config("http://llm.test/v1", None);
        cfg.allowed_origins = vec!["http://app.test".to_string()];
        let response = router_with(&cfg)
            .oneshot(preflight("http://app.test"))
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://app.test");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    }

    #[tokio::test]
    async fn unlisted_origin_is_not_echoed() {
        let mut cfg = test_config("http://llm.test/v1", None);
        cfg.allowed_origins = vec!["http://app.test".to_string()];
        let response = router_with(&cfg)
            .oneshot(preflight("http://evil.test"))
            .await
            .unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
