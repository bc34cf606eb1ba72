//! Web Search Tool
//!
//! Stand-in search that returns deterministic mock results. Swap in a real
//! search backend by registering another tool under the same name.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::{AgentError, Result};
use crate::tool::{ParameterSchema, Tool, ToolArguments, ToolSchema};

const DEFAULT_MAX_RESULTS: u64 = 5;

/// Web search tool backed by canned results
pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "web_search".into(),
            description: "Search the web for information on a given topic".into(),
            parameters: vec![
                ParameterSchema::required("query", "string", "The search query"),
                ParameterSchema::optional(
                    "max_results",
                    "integer",
                    "Maximum number of results to return",
                )
                .with_default(json!(DEFAULT_MAX_RESULTS)),
            ],
        }
    }

    async fn execute(&self, args: &ToolArguments) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AgentError::ToolValidation("Query must not be empty".into()))?;

        let max_results = args
            .get("max_results")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_MAX_RESULTS);

        let results: Vec<Value> = [json!({
            "title": format!("Search result for: {query}"),
            "url": "https://example.com",
            "snippet": format!("This is a mock search result for the query: {query}"),
        })]
        .into_iter()
        .take(usize::try_from(max_results).unwrap_or(usize::MAX))
        .collect();

        Ok(json!({
            "success": true,
            "total_results": results.len(),
            "results": results,
            "query": query,
        }))
    }
}
