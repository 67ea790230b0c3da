//! 时钟工具

use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::{parse_args, Tool, ToolFailure};

#[derive(Debug, Deserialize, JsonSchema)]
struct GetTimeInput {
    /// UTC offset such as "+09:00" or "-05:30"; "UTC" and "Z" are accepted
    offset: String,
}

/// 当前时间（按给定 UTC 偏移）
pub struct ClockTool;

#[async_trait]
impl Tool for ClockTool {
    fn name(&self) -> &str {
        "get_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time for a UTC offset, e.g. {\"offset\": \"+09:00\"}."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(GetTimeInput)).unwrap_or_default()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolFailure> {
        let input: GetTimeInput = parse_args(&args)?;
        let offset = match input.offset.as_str() {
            "UTC" | "utc" | "Z" | "z" => FixedOffset::east_opt(0).unwrap(),
            other => other
                .parse::<FixedOffset>()
                .map_err(|_| ToolFailure::invalid(format!("invalid UTC offset: {}", other)))?,
        };
        let now = Utc::now().with_timezone(&offset);
        Ok(json!({
            "offset": input.offset,
            "iso": now.to_rfc3339(),
            "date": now.format("%Y-%m-%d").to_string(),
            "time": now.format("%H:%M:%S").to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seoul_offset_is_nine_hours_ahead() {
        let result = ClockTool
            .invoke(json!({"offset": "+09:00"}))
            .await
            .unwrap();
        assert_eq!(result["offset"], "+09:00");
        assert!(result["iso"].as_str().unwrap().ends_with("+09:00"));
    }

    #[tokio::test]
    async fn bad_offset_is_validation_failure() {
        let err = ClockTool
            .invoke(json!({"offset": "Asia/Seoul"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolFailure::Validation(_)));
    }
}
