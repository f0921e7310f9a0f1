//! Modelos de dominio: mensajes de chat y el grafo de conocimiento.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claves obligatorias en el JSON del grafo.
pub const REQUIRED_GRAPH_KEYS: [&str; 3] = ["clusters", "links", "summary"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Un mensaje de la conversación enviada al modelo. El orden importa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// Agrupación temática de conceptos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    pub concepts: Vec<String>,
    pub source_docs: Vec<String>,
}

/// Relación etiquetada entre dos clusters (por `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub relation_label: String,
}

/// Grafo tipado que produce el generador sintético.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    pub clusters: Vec<Cluster>,
    pub links: Vec<Link>,
    pub summary: String,
}

/// Grafo tal como lo devuelve el LLM: un objeto JSON del que sólo se exige
/// que tenga `clusters`, `links` y `summary`. El resto se conserva tal cual.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Graph(Map<String, Value>);

impl Graph {
    /// Valida las claves de primer nivel. Devuelve la primera que falte.
    pub fn from_value(value: Value) -> Result<Self, String> {
        let Value::Object(map) = value else {
            return Err("el JSON no es un objeto".to_string());
        };
        if let Some(missing) = REQUIRED_GRAPH_KEYS.iter().find(|k| !map.contains_key(**k)) {
            return Err(format!("Falta la clave: {missing}"));
        }
        Ok(Self(map))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roles_serialize_lowercase() {
        let msg = ChatMessage::system("hola");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"role": "system", "content": "hola"})
        );
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), json!("assistant"));
    }

    #[test]
    fn graph_requires_top_level_keys() {
        let err = Graph::from_value(json!({"clusters": [], "links": []})).unwrap_err();
        assert!(err.contains("summary"));

        assert!(Graph::from_value(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn graph_keeps_unknown_fields_and_nested_shapes() {
        let raw = json!({
            "clusters": [{"id": "a", "weird": true}],
            "links": "not even a list",
            "summary": "ok",
            "extra": 1
        });
        let graph = Graph::from_value(raw.clone()).unwrap();
        assert_eq!(graph.get("extra"), Some(&json!(1)));
        assert_eq!(serde_json::to_value(&graph).unwrap(), raw);
    }

    #[test]
    fn typed_graph_has_the_same_shape_as_loose_graph() {
        let data = GraphData {
            clusters: vec![Cluster {
                id: "c1".into(),
                label: "Heat Pumps".into(),
                concepts: vec!["COP".into()],
                source_docs: vec!["heat_pumps_1.txt".into()],
            }],
            links: vec![],
            summary: "s".into(),
        };
        let value = serde_json::to_value(&data).unwrap();
        let graph = Graph::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&graph).unwrap(), value);
    }
}
