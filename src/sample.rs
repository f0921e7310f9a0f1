//! Generador de grafos sintéticos para demos y pruebas sin LLM.
//!
//! Determinista para una semilla dada: usa `StdRng` de `rand` 0.8 sembrado con
//! `seed_from_u64`. `rand` no garantiza que el algoritmo de `StdRng` se mantenga
//! entre versiones, así que la salida sólo es estable mientras la versión de
//! `rand` fijada en `Cargo.lock` no cambie; no es idéntica a otras
//! implementaciones del generador.

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::models::{Cluster, GraphData, Link};

pub const LABEL_BANK: [&str; 24] = [
    "AI for Climate Modeling", "Carbon Capture Methods", "Renewable Energy Trends",
    "Battery Storage", "Grid Optimization", "Policy & Incentives", "EV Adoption",
    "Hydrogen Tech", "Ocean Solutions", "Satellite Sensing", "Agri Emissions",
    "Methane Monitoring", "Trading & Offsets", "Carbon Accounting", "Wildfire Risk",
    "Extreme Weather", "Demand Response", "Building Efficiency", "Heat Pumps",
    "Nuclear SMR", "Geothermal", "Biofuels", "CCUS Infrastructure", "Supply Chains",
];

pub const CONCEPT_BANK: [&str; 44] = [
    "forecasting", "time series", "LCOE", "curtailment", "grid inertia", "flexibility",
    "sensor fusion", "ensemble models", "optimization", "LLM extraction", "retrieval",
    "QA pairs", "embedding", "classification", "regression", "policy levers", "tax credits",
    "CAPEX", "OPEX", "MRV", "DAC", "BECCS", "amine scrubbing", "electrolysis",
    "pipeline transport", "storage", "permitting", "satellites", "SAR", "microwave",
    "hyperspectral", "OCR", "document parsing", "scenario analysis", "Monte Carlo",
    "risk scoring", "benchmarking", "baseline", "offset integrity", "additionality",
    "verification", "alerts", "anomaly detection", "centrality",
];

pub const RELATION_LABELS: [&str; 6] = ["depends", "informs", "tradeoff", "enables", "costs", "relates"];

const RING_LABEL: &str = "related";

/// Parámetros predefinidos para `/sample?size=...`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePreset {
    pub clusters: usize,
    pub concepts: usize,
    pub link_prob: f64,
}

impl SamplePreset {
    pub const SMALL: Self = Self { clusters: 3, concepts: 6, link_prob: 0.25 };
    pub const MEDIUM: Self = Self { clusters: 8, concepts: 7, link_prob: 0.33 };
    pub const LARGE: Self = Self { clusters: 14, concepts: 8, link_prob: 0.40 };

    /// Coincidencia exacta; cualquier otro valor cae en `small`.
    pub fn for_size(size: &str) -> Self {
        match size {
            "medium" => Self::MEDIUM,
            "large" => Self::LARGE,
            _ => Self::SMALL,
        }
    }
}

/// Genera un grafo sintético conectado (anillo) con enlaces extra aleatorios.
pub fn build_sample_graph(
    n_clusters: usize,
    concepts_per: usize,
    link_prob: f64,
    seed: i64,
) -> GraphData {
    let mut rng = StdRng::seed_from_u64(seed as u64);

    let n = n_clusters.min(LABEL_BANK.len());
    let labels: Vec<&str> = LABEL_BANK.choose_multiple(&mut rng, n).copied().collect();

    let k = concepts_per.min(CONCEPT_BANK.len());
    let clusters: Vec<Cluster> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let concepts = CONCEPT_BANK
                .choose_multiple(&mut rng, k)
                .map(|c| c.to_string())
                .collect();
            let doc_count = rng.gen_range(2..=6);
            Cluster {
                id: format!("c{}", i + 1),
                label: label.to_string(),
                concepts,
                source_docs: doc_names(label, doc_count),
            }
        })
        .collect();

    let mut links = Vec::new();

    // Anillo: garantiza que el grafo es conexo. Con un solo cluster no hay enlaces.
    if clusters.len() > 1 {
        for (i, cluster) in clusters.iter().enumerate() {
            let next = &clusters[(i + 1) % clusters.len()];
            links.push(link(cluster, next, RING_LABEL));
        }
    }

    // Enlaces extra entre pares no adyacentes.
    for i in 0..clusters.len() {
        for j in (i + 2)..clusters.len() {
            if rng.gen::<f64>() < link_prob {
                let relation = RELATION_LABELS[rng.gen_range(0..RELATION_LABELS.len())];
                links.push(link(&clusters[i], &clusters[j], relation));
            }
        }
    }

    let summary = format!(
        "{n_clusters} thematic clusters link policy, technology, and deployment. \
         Typical concepts per cluster ≈{concepts_per}; density controlled by link_prob={link_prob}. \
         Dependencies highlight how upstream infrastructure and incentives shape downstream adoption."
    );

    GraphData { clusters, links, summary }
}

fn doc_names(label: &str, count: usize) -> Vec<String> {
    let stem = label.replace(' ', "_").to_lowercase();
    (1..=count).map(|j| format!("{stem}_{j}.txt")).collect()
}

fn link(source: &Cluster, target: &Cluster, relation: &str) -> Link {
    Link {
        source: source.id.clone(),
        target: target.id.clone(),
        relation_label: relation.to_string(),
    }
}
