//! 工具注册表与统一调度
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / risky /
//! invoke），由 ToolRegistry 按名注册与查找。call 是唯一的调度入口：
//! 参数校验失败与运行时失败都转成结构化 Observation 返回（绝不 panic、
//! 绝不向上抛），只有未知工具名是致命的注册表误用；每次调用输出一条
//! 结构化审计日志（JSON）。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::time::timeout;

use crate::core::AgentError;

/// 工具调用失败的两种可恢复形态；注册表负责转成 Observation
#[derive(Debug)]
pub enum ToolFailure {
    /// 参数不符合声明的 schema
    Validation(Vec<String>),
    /// 处理器内部失败（外部服务出错、除零等）
    Runtime(String),
}

impl ToolFailure {
    pub fn runtime(msg: impl Into<String>) -> Self {
        ToolFailure::Runtime(msg.into())
    }

    pub fn invalid(detail: impl Into<String>) -> Self {
        ToolFailure::Validation(vec![detail.into()])
    }
}

/// 将 JSON 参数解析为类型化输入；serde 错误即校验失败
pub fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T, ToolFailure> {
    serde_json::from_value(args.clone()).map_err(|e| ToolFailure::Validation(vec![e.to_string()]))
}

/// 工具 trait：名称全局唯一；parameters_schema 由 schemars 生成；
/// risky 为 true 的工具在执行前需要人工确认
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// 工具描述（供 LLM 理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema（供 LLM 生成正确的参数格式）
    fn parameters_schema(&self) -> Value;

    /// 是否高危（执行前挂起等待人工确认）
    fn risky(&self) -> bool {
        false
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolFailure>;
}

/// 工具目录条目：呈现给推理能力的 {name, description, parameters}
#[derive(Debug, Clone, serde::Serialize)]
pub struct CatalogueEntry {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具注册表：按名称存储 Arc<dyn Tool>。
/// BTreeMap 保证目录顺序确定，推理请求可复现。
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
    timeout: Duration,
}

impl ToolRegistry {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            tools: BTreeMap::new(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 注册工具；同名重复注册立即失败（注册期错误，不延迟到调用时）
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), AgentError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// 工具目录（按名称排序）
    pub fn catalogue(&self) -> Vec<CatalogueEntry> {
        self.tools
            .values()
            .map(|tool| CatalogueEntry {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// 调度一次工具调用。
    ///
    /// 未知工具名返回 Err（致命）；其余一律 Ok：校验失败返回
    /// `{"error": "validation_error", "details": [...]}`，运行时失败返回
    /// `{"error": "runtime_error", "details": "..."}`（超时同样按运行时
    /// 失败处理），成功则原样返回处理器的结构化结果。
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, AgentError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, tool.invoke(args)).await;

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(ToolFailure::Validation(_))) => (false, "validation_error"),
            Ok(Err(ToolFailure::Runtime(_))) => (false, "runtime_error"),
            Err(_) => (false, "timeout"),
        };
        let audit = json!({
            "event": "tool_audit",
            "tool": name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        Ok(match result {
            Ok(Ok(value)) => value,
            Ok(Err(ToolFailure::Validation(details))) => {
                json!({"error": "validation_error", "details": details})
            }
            Ok(Err(ToolFailure::Runtime(detail))) => {
                json!({"error": "runtime_error", "details": detail})
            }
            Err(_) => json!({
                "error": "runtime_error",
                "details": format!("tool '{}' timed out after {:?}", name, self.timeout),
            }),
        })
    }
}

fn args_preview(args: &Value) -> String {
    let s = args.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
