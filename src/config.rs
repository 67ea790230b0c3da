//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MAGPIE__*` 覆盖
//! （双下划线表示嵌套，如 `MAGPIE__LLM__MODEL=gpt-4o`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentSection,
    pub llm: LlmSection,
    pub embedding: EmbeddingSection,
    pub memory: MemorySection,
    pub tools: ToolsSection,
}

/// [agent] 段：推理步数上限与线程检查点目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// 单次 run 的 Reasoning 轮数上限；超出转 Terminal 并给出哨兵回答
    pub max_cycles: usize,
    /// 线程检查点目录
    pub thread_dir: PathBuf,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_cycles: 6,
            thread_dir: PathBuf::from("data/threads"),
        }
    }
}

/// [llm] 段：OpenAI 兼容端点与模型
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    pub base_url: Option<String>,
    /// 0.0 即确定性模式（可复现测试）
    pub temperature: f32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: 0.0,
        }
    }
}

/// [embedding] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub model: String,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
        }
    }
}

/// [memory] 段：存储位置与淘汰参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub db_path: PathBuf,
    pub knowledge_db_path: PathBuf,
    /// 长期记忆条数上限（cleanup 的目标）
    pub max_count: usize,
    /// 每完成一轮对话后触发 cleanup 的采样概率（轻量维护，非后台任务）
    pub maintenance_probability: f64,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/memory.db"),
            knowledge_db_path: PathBuf::from("data/knowledge.db"),
            max_count: 500,
            maintenance_probability: 0.033,
        }
    }
}

/// [tools] 段：调度超时与搜索超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub search_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
            search_timeout_secs: 15,
        }
    }
}

/// 从 config 目录加载配置，环境变量 MAGPIE__* 可覆盖
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MAGPIE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.max_cycles, 6);
        assert_eq!(cfg.memory.max_count, 500);
        assert!(cfg.memory.maintenance_probability < 0.1);
        assert_eq!(cfg.llm.temperature, 0.0);
    }
}
