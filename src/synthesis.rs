//! Construcción del grafo de conocimiento a partir de textos, vía LLM.

use serde_json::Value;
use tracing::info;

use crate::{
    error::AppError,
    llm::ChatClient,
    models::{ChatMessage, Graph},
};

/// Máximo de caracteres del corpus que se envía al modelo.
pub const MAX_CORPUS_CHARS: usize = 120_000;

const GRAPH_TEMPERATURE: f64 = 0.2;

const GRAPH_SYSTEM_PROMPT: &str = concat!(
    "You are InsightGraph, an analysis engine that turns multiple documents into a knowledge graph. ",
    "Given a corpus of texts, you MUST output strict JSON with this schema: ",
    "{",
    "\"clusters\":[{\"id\":string,\"label\":string,\"concepts\":[string],\"source_docs\":[string]}],",
    "\"links\":[{\"source\":string,\"target\":string,\"relation_label\":string}],",
    "\"summary\":string",
    "}. ",
    "Rules: 6-14 clusters, concise labels (2-5 words), 5-10 concepts per cluster, 8-28 links, ",
    "relation_label short (<=3 words). The summary is 4-7 sentences, executive tone. Return ONLY JSON."
);

/// Pide al modelo el grafo de los textos y valida las claves de primer nivel.
pub async fn build_graph(chat: &ChatClient, texts: &[String]) -> Result<Graph, AppError> {
    let corpus = truncate_chars(&texts.join("\n\n"), MAX_CORPUS_CHARS).to_string();
    info!("Solicitando grafo al LLM ({} caracteres de corpus)", corpus.chars().count());

    let messages = [
        ChatMessage::system(GRAPH_SYSTEM_PROMPT),
        ChatMessage::user(corpus),
    ];
    let content = chat.chat(&messages, GRAPH_TEMPERATURE).await?;

    let graph = parse_graph(&content)?;
    info!(
        "Grafo recibido: {} clusters, {} enlaces",
        count(graph.get("clusters")),
        count(graph.get("links"))
    );
    Ok(graph)
}

/// Limpia las vallas de código y parsea el JSON del grafo.
pub fn parse_graph(content: &str) -> Result<Graph, AppError> {
    let cleaned = strip_code_fence(content);
    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| AppError::GraphParse(e.to_string()))?;
    Graph::from_value(value).map_err(AppError::GraphParse)
}

/// Quita los ``` (y una etiqueta `json` opcional) que envuelven la respuesta.
pub fn strip_code_fence(content: &str) -> &str {
    let s = content.trim();
    if !s.starts_with("```") {
        return s;
    }
    let s = s.trim_matches('`');
    let s = match s.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &s[4..],
        _ => s,
    };
    s.trim()
}

/// Prefijo de como mucho `max` caracteres, sin partir secuencias UTF-8.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn count(value: Option<&Value>) -> usize {
    value.and_then(Value::as_array).map_or(0, Vec::len)
}
