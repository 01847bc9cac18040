//! `semantic_search`: similarity search over an external retriever.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::tool::{FunctionTool, Json};
use crate::error::ScouterError;

pub const SEMANTIC_SEARCH: &str = "semantic_search";

const MAX_TOP_K: u32 = 20;

/// Arguments the model passes to `semantic_search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    /// Exact user query.
    pub query_text: String,
    /// Number of results to return (1-20).
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    /// Optional filters.
    #[serde(default)]
    pub filters: Option<serde_json::Map<String, serde_json::Value>>,
    /// Search pool multiplier for better accuracy.
    #[serde(default = "default_search_ratio")]
    pub effective_search_ratio: f64,
}

fn default_top_k() -> u32 {
    10
}

fn default_search_ratio() -> f64 {
    1.0
}

/// One retrieved chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchHit {
    pub node_id: String,
    pub score: f64,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResults {
    pub results: Vec<SearchHit>,
}

/// Black-box similarity search backend (vector index, graph store, ...).
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Hits ordered by descending score, at most `query.top_k` of them.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ScouterError>;
}

/// Build the `semantic_search` tool over a retriever.
///
/// `top_k` is clamped to `1..=20` before the retriever sees it.
pub fn semantic_search_tool(retriever: Arc<dyn Retriever>) -> FunctionTool {
    FunctionTool::new(
        SEMANTIC_SEARCH,
        "Find relevant information based on cosine similarity search.",
        move |mut query: SearchQuery| {
            let retriever = Arc::clone(&retriever);
            async move {
                query.top_k = query.top_k.clamp(1, MAX_TOP_K);
                let mut results = retriever.search(&query).await?;
                results.truncate(query.top_k as usize);
                Ok(Json(SearchResults { results }))
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::registry::ToolRegistry;
    use crate::tools::tool::Tool;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        seen: Mutex<Vec<SearchQuery>>,
    }

    #[async_trait]
    impl Retriever for Recording {
        async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, ScouterError> {
            self.seen.lock().unwrap().push(query.clone());
            Ok((0..25)
                .map(|i| SearchHit {
                    node_id: format!("chunk-{i}"),
                    score: 1.0 - i as f64 / 100.0,
                    content: format!("text {i}"),
                    metadata: serde_json::Map::new(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn defaults_apply_and_top_k_is_clamped() {
        let retriever = Arc::new(Recording::default());
        let registry = ToolRegistry::new();
        registry
            .register(semantic_search_tool(retriever.clone()))
            .unwrap();

        let payload = registry
            .run(SEMANTIC_SEARCH, r#"{"query_text":"graph rag","top_k":50}"#)
            .await
            .unwrap();
        let parsed: SearchResults = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed.results.len(), 20);
        assert_eq!(parsed.results[0].node_id, "chunk-0");

        registry
            .run(SEMANTIC_SEARCH, r#"{"query_text":"graph rag"}"#)
            .await
            .unwrap();

        let seen = retriever.seen.lock().unwrap();
        assert_eq!(seen[0].top_k, 20);
        assert_eq!(seen[1].top_k, 10);
        assert_eq!(seen[1].effective_search_ratio, 1.0);
        assert!(seen[1].filters.is_none());
    }

    #[test]
    fn description_includes_result_schema() {
        let tool = semantic_search_tool(Arc::new(Recording::default()));
        let spec = tool.spec();

        assert!(spec.description.contains("node_id"));
        assert_eq!(spec.parameters["required"], serde_json::json!(["query_text"]));
    }
}
