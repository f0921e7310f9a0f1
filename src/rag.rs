//! Preguntas y respuestas sobre un grafo ya generado.
//!
//! El grafo lo envía el cliente en cada pregunta; aquí sólo se recorta a un
//! resumen acotado (el "digest") que se pasa al LLM como contexto.

use serde_json::{json, Value};

use crate::{error::ChatError, llm::ChatClient, models::ChatMessage};

const MAX_CLUSTERS: usize = 10;
const MAX_CONCEPTS: usize = 10;
const MAX_DOCS: usize = 5;
const MAX_LINKS: usize = 30;

const QA_TEMPERATURE: f64 = 0.2;

const QA_SYSTEM_PROMPT: &str = "You are InsightGraph QA. Answer the user's question using ONLY the provided context. \
Return a concise, actionable answer (4-8 sentences). If context is insufficient, say what is missing. \
When useful, refer to cluster labels or document names from the context.";

/// Responde a `question` usando únicamente el contexto del grafo.
pub async fn answer_question(
    chat: &ChatClient,
    question: &str,
    graph: &Value,
) -> Result<String, ChatError> {
    let digest = context_digest(graph);
    let user = format!("Question: {question}\n\nContext JSON:\n{digest}");

    let messages = [ChatMessage::system(QA_SYSTEM_PROMPT), ChatMessage::user(user)];
    let answer = chat.chat(&messages, QA_TEMPERATURE).await?;
    Ok(answer.trim().to_string())
}

/// Resumen acotado del grafo: primeros clusters (con conceptos y documentos
/// recortados) y primeros enlaces, en el orden original.
pub fn context_digest(graph: &Value) -> Value {
    let clusters: Vec<Value> = prefix(graph.get("clusters"), MAX_CLUSTERS)
        .iter()
        .map(|c| {
            json!({
                "id": c.get("id"),
                "label": c.get("label"),
                "concepts": prefix(c.get("concepts"), MAX_CONCEPTS),
                "docs": prefix(c.get("source_docs"), MAX_DOCS),
            })
        })
        .collect();

    json!({
        "summary": graph.get("summary").cloned().unwrap_or_else(|| json!("")),
        "clusters": clusters,
        "links": prefix(graph.get("links"), MAX_LINKS),
    })
}

fn prefix(value: Option<&Value>, max: usize) -> &[Value] {
    match value.and_then(Value::as_array) {
        Some(items) => &items[..items.len().min(max)],
        None => &[],
    }
}
