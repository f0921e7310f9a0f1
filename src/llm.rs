//! Cliente de chat para la API de Blackbox (compatible con OpenAI).
//!
//! Prueba una lista ordenada de modelos hasta que uno responde. Un 401 o una
//! respuesta 200 con forma inesperada cortan la cadena: no dependen del modelo.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{config::AppConfig, error::ChatError, models::ChatMessage};

/// Tiempo máximo por intento (por modelo).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Longitud máxima del cuerpo de error que se guarda por modelo.
const ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Resultado de probar un único modelo.
#[derive(Debug)]
enum Attempt {
    Answer(String),
    Retry(String),
    Fatal(ChatError),
}

/// Cliente de chat con cadena de modelos de respaldo.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    api_url: String,
    api_key: Option<String>,
    models: Vec<String>,
}

impl ChatClient {
    /// Construye el cliente a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("No se pudo inicializar el cliente HTTP")?;

        Ok(Self {
            http,
            api_url: cfg.api_url.to_string(),
            api_key: cfg.api_key.clone(),
            models: cfg.model_candidates(),
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Envía la conversación y devuelve el texto del asistente.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
    ) -> Result<String, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::Config)?;

        let mut errors: Vec<String> = Vec::new();
        for model in &self.models {
            match self.attempt(api_key, model, messages, temperature).await {
                Attempt::Answer(content) => {
                    info!("Respuesta obtenida con el modelo {}", model);
                    return Ok(content);
                }
                Attempt::Retry(note) => {
                    warn!("Modelo {} descartado: {}", model, note);
                    errors.push(format!("{model}: {note}"));
                }
                Attempt::Fatal(err) => return Err(err),
            }
        }

        Err(ChatError::AllModelsFailed(errors.join(" | ")))
    }

    async fn attempt(
        &self,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
        temperature: f64,
    ) -> Attempt {
        let payload = ChatRequest {
            model,
            messages,
            temperature,
        };

        // Se envían ambos estilos de autenticación: distintos despliegues
        // aceptan uno u otro.
        let sent = self
            .http
            .post(&self.api_url)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-blackbox-key", api_key)
            .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
            .json(&payload)
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(format!("error de red {e}")),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Attempt::Retry(format!("error de red {e}")),
        };

        classify(status, &body)
    }
}

fn classify(status: StatusCode, body: &str) -> Attempt {
    match status {
        StatusCode::OK => match parse_content(body) {
            Some(content) => Attempt::Answer(content),
            None => Attempt::Fatal(ChatError::ResponseShape),
        },
        StatusCode::UNAUTHORIZED => Attempt::Fatal(ChatError::Auth(body.to_string())),
        other => {
            let snippet: String = body.chars().take(ERROR_BODY_CHARS).collect();
            Attempt::Retry(format!("{} {}", other.as_u16(), snippet))
        }
    }
}

fn parse_content(body: &str) -> Option<String> {
    let parsed: ChatResponse = serde_json::from_str(body).ok()?;
    parsed.choices.into_iter().next().map(|c| c.message.content)
}
