use anyhow::{Context as _, Result};
use async_trait::async_trait;
use parley_core::config::SearchConfig;
use serde_json::{json, Value};

use crate::builtin::{rejected, string_arg};
use crate::context::ResponseContext;
use crate::registry::{FunctionDescriptor, Handler, ToolHandler};
use crate::schema::{Param, ParamType, SchemaError};

const DESCRIPTION: &str = "Search for a query using search engine.
This function get the search result from search engine.
Use this to get real-time data like weather, news, time, etc.
You should use Vietnamese query or English query to get the best result.
Search query should be concise and clear.";

const RESULT_COUNT: &str = "10";

pub(super) fn descriptor(
    http: reqwest::Client,
    config: SearchConfig,
) -> Result<FunctionDescriptor, SchemaError> {
    FunctionDescriptor::new(
        "search",
        DESCRIPTION,
        &[Param::new("q", ParamType::string()).describe("Search question")],
        Handler::from_async(Search { http, config }),
    )
}

/// Google Custom Search; each item becomes `{url, title, description, type}`.
pub struct Search {
    http: reqwest::Client,
    config: SearchConfig,
}

#[async_trait]
impl ToolHandler for Search {
    async fn call(&self, _ctx: &mut ResponseContext, args: Value) -> Result<Value> {
        let q = string_arg(&args, "q")?;
        let resp = self
            .http
            .get(&self.config.endpoint)
            .query(&[
                ("key", self.config.api_key.as_str()),
                ("cx", self.config.cx_id.as_str()),
                ("q", q),
                ("num", RESULT_COUNT),
            ])
            .send()
            .await
            .context("search request failed")?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "search API error");
            return Ok(rejected(&format!("search failed with HTTP {status}")));
        }
        let body: Value = resp.json().await.context("search response is not JSON")?;

        let results: Vec<Value> = body
            .get("items")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|item| {
                Some(json!({
                    "url": item.get("link")?.as_str()?,
                    "title": item.get("title").and_then(Value::as_str).unwrap_or_default(),
                    "description": item.get("snippet").and_then(Value::as_str).unwrap_or_default(),
                    "type": "web",
                }))
            })
            .collect();
        if results.is_empty() {
            return Ok(rejected("No results found for the given query."));
        }
        Ok(json!({ "success": true, "results": results }))
    }
}
