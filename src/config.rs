//! Carga y gestión de configuración de la aplicación (API de Blackbox + servidor).

use std::env;
use anyhow::{anyhow, Result};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.blackbox.ai/v1/chat/completions";

/// Modelos que se prueban, en orden, si no hay uno forzado o si éste falla.
pub const MODEL_FALLBACKS: &[&str] = &[
    "blackboxai-pro",
    "blackboxai-8x7b",
    "gpt-4o", // alias compatible con OpenAI en algunos tenants
    "gpt-4",
];

const DEFAULT_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173,*";
const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8000";

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: Url,
    pub api_key: Option<String>,
    pub forced_model: Option<String>,
    pub allowed_origins: Vec<String>,
    pub server_addr: String,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    ///
    /// La ausencia de `BLACKBOX_API_KEY` no impide arrancar: se informa en cada
    /// petición que necesite el LLM.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de consulta
    /// (`env::var` en producción).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url_str = lookup("BLACKBOX_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = Url::parse(api_url_str.trim())
            .map_err(|e| anyhow!("BLACKBOX_API_URL no es una URL válida ({api_url_str}): {e}"))?;

        let api_key = non_empty(lookup("BLACKBOX_API_KEY"));
        let forced_model = non_empty(lookup("BLACKBOX_MODEL"));

        let allowed_origins = parse_origins(
            &lookup("ALLOWED_ORIGINS").unwrap_or_else(|| DEFAULT_ORIGINS.to_string()),
        );

        let server_addr =
            lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string());

        Ok(Self {
            api_url,
            api_key,
            forced_model,
            allowed_origins,
            server_addr,
        })
    }

    /// Lista ordenada y sin duplicados de modelos candidatos.
    pub fn model_candidates(&self) -> Vec<String> {
        let mut models: Vec<String> = Vec::new();
        let forced = self.forced_model.iter().map(String::as_str);
        for model in forced.chain(MODEL_FALLBACKS.iter().copied()) {
            let model = model.trim();
            if !model.is_empty() && !models.iter().any(|m| m == model) {
                models.push(model.to_string());
            }
        }
        models
    }

    /// `true` si la lista de orígenes incluye el comodín `*`.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) fn test_config(api_url: &str, api_key: Option<&str>) -> AppConfig {
    AppConfig {
        api_url: Url::parse(api_url).expect("url de prueba"),
        api_key: api_key.map(str::to_string),
        forced_model: None,
        allowed_origins: vec!["*".to_string()],
        server_addr: "127.0.0.1:0".to_string(),
    }
}
