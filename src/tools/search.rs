//! Web 搜索工具（Google Custom Search）
//!
//! 凭据来自环境变量 GOOGLE_API_KEY / GOOGLE_CX；缺失时按运行时失败
//! 返回 Observation。高危工具：执行前需要人工确认。

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::{parse_args, Tool, ToolFailure};

const SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

fn default_num_results() -> usize {
    5
}

#[derive(Debug, Deserialize, JsonSchema)]
struct WebSearchInput {
    /// The search query string
    query: String,
    /// Number of results to return (1-10)
    #[serde(default = "default_num_results")]
    num_results: usize,
}

/// Google CSE 搜索
pub struct WebSearchTool {
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web via Google and return the top results."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(WebSearchInput)).unwrap_or_default()
    }

    fn risky(&self) -> bool {
        true
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolFailure> {
        let input: WebSearchInput = parse_args(&args)?;
        if input.query.trim().is_empty() {
            return Err(ToolFailure::invalid("query must not be empty"));
        }
        if !(1..=10).contains(&input.num_results) {
            return Err(ToolFailure::invalid("num_results must be between 1 and 10"));
        }

        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| ToolFailure::runtime("GOOGLE_API_KEY is not set"))?;
        let cx = std::env::var("GOOGLE_CX")
            .map_err(|_| ToolFailure::runtime("GOOGLE_CX is not set"))?;

        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("key", api_key.as_str()),
                ("cx", cx.as_str()),
                ("q", input.query.as_str()),
                ("num", &input.num_results.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ToolFailure::runtime(e.to_string()))?
            .error_for_status()
            .map_err(|e| ToolFailure::runtime(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolFailure::runtime(e.to_string()))?;

        let results: Vec<Value> = body["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| {
                        json!({
                            "title": item["title"],
                            "link": item["link"],
                            "snippet": item["snippet"],
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(json!({"results": results, "source": "google_cse"}))
    }
}
