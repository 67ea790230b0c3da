//! 无界面 Agent 运行时
//!
//! 供 CLI 等前端调用：create_components 按配置组装 LLM / 嵌入 / 存储 /
//! 工具箱 / 反思引擎 / 编排器（全部显式构造、按引用传递，无全局单例）；
//! process_message / resume_thread 驱动一轮并在每次落检查点，完成一轮后
//! 按配置概率做一次记忆维护采样。

use std::sync::Arc;

use rand::Rng;

use crate::config::AppConfig;
use crate::core::{AgentError, Orchestrator, TurnOutcome};
use crate::llm::{
    create_embedder_from_config, ChatClient, MockChatClient, OpenAiClient,
};
use crate::memory::{Message, MemoryStore, SqliteMemoryStore, ThreadStore};
use crate::reflect::ReflectionEngine;
use crate::tools::{
    CalculateTool, ClockTool, RagSearchTool, ReadMemoryTool, ToolRegistry, WebSearchTool,
    WriteMemoryTool,
};

/// 默认 system prompt（前端可在建线程前替换）
const SYSTEM_PROMPT: &str = "\
You are an AI assistant with tools, a knowledge base and long-term memory.
- Be helpful, honest and concise; answer in the user's language.
- Call tools instead of guessing when they can help.
- Call read_memory when the user refers to earlier sessions or their own \
preferences; call write_memory for stable preferences, long-term goals and \
important facts — never for one-off details.";

/// 预构建的 Agent 组件，可多会话共享
pub struct AgentComponents {
    pub orchestrator: Orchestrator,
    pub threads: ThreadStore,
    pub memory: Arc<dyn MemoryStore>,
    pub knowledge: Arc<dyn MemoryStore>,
    pub reflection: Arc<ReflectionEngine>,
    pub config: AppConfig,
}

/// 有 OPENAI_API_KEY 时走 OpenAI 兼容端点，否则退回 Mock（无 Key 本地跑通）
fn create_chat_from_config(cfg: &AppConfig) -> Arc<dyn ChatClient> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.is_empty() => {
            tracing::info!(model = %cfg.llm.model, "using OpenAI-compatible LLM");
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                Some(&key),
                Some(cfg.llm.temperature),
            ))
        }
        _ => {
            tracing::warn!("no OPENAI_API_KEY set, using Mock LLM");
            Arc::new(MockChatClient)
        }
    }
}

/// 组装全部组件；注册表、存储等进程级资源在此构造一次后注入
pub fn create_components(cfg: AppConfig) -> Result<AgentComponents, AgentError> {
    let chat = create_chat_from_config(&cfg);
    let embedder = create_embedder_from_config(cfg.llm.base_url.as_deref(), &cfg.embedding.model);

    let memory: Arc<dyn MemoryStore> =
        Arc::new(SqliteMemoryStore::open(&cfg.memory.db_path, embedder.clone())?);
    let knowledge: Arc<dyn MemoryStore> = Arc::new(SqliteMemoryStore::open(
        &cfg.memory.knowledge_db_path,
        embedder,
    )?);

    let mut registry = ToolRegistry::new(cfg.tools.tool_timeout_secs);
    registry.register(ClockTool)?;
    registry.register(CalculateTool)?;
    registry.register(WebSearchTool::new(cfg.tools.search_timeout_secs))?;
    registry.register(RagSearchTool::new(knowledge.clone()))?;
    registry.register(ReadMemoryTool::new(memory.clone()))?;
    registry.register(WriteMemoryTool::new(memory.clone()))?;

    let reflection = Arc::new(ReflectionEngine::new(chat.clone(), memory.clone()));
    let orchestrator = Orchestrator::new(chat, Arc::new(registry), cfg.agent.max_cycles)
        .with_reflection(reflection.clone());

    Ok(AgentComponents {
        orchestrator,
        threads: ThreadStore::new(&cfg.agent.thread_dir),
        memory,
        knowledge,
        reflection,
        config: cfg,
    })
}

/// 处理一条用户消息：恢复/新建线程，跑状态机，落检查点
pub async fn process_message(
    components: &AgentComponents,
    thread_id: &str,
    user_input: &str,
) -> Result<TurnOutcome, AgentError> {
    let mut thread = components.threads.load_or_create(thread_id)?;
    if thread.messages().is_empty() {
        thread.push_message(Message::system(SYSTEM_PROMPT));
    }
    let outcome = components
        .orchestrator
        .run_turn(&mut thread, user_input)
        .await?;
    components.threads.save(&thread)?;
    after_run(components, &outcome);
    Ok(outcome)
}

/// 用确认 token 恢复挂起的线程
pub async fn resume_thread(
    components: &AgentComponents,
    thread_id: &str,
    token: &str,
) -> Result<TurnOutcome, AgentError> {
    let mut thread = components
        .threads
        .load(thread_id)?
        .ok_or(AgentError::NotSuspended)?;
    let outcome = components.orchestrator.resume(&mut thread, token).await?;
    components.threads.save(&thread)?;
    after_run(components, &outcome);
    Ok(outcome)
}

/// 完成一轮后的维护采样：按配置概率触发一次有界淘汰
fn after_run(components: &AgentComponents, outcome: &TurnOutcome) {
    if !matches!(outcome, TurnOutcome::Completed { .. }) {
        return;
    }
    let skipped = components.reflection.parse_failures();
    if skipped > 0 {
        tracing::debug!(reflection_parse_failures = skipped, "reflection skip counter");
    }
    let p = components.config.memory.maintenance_probability;
    if p > 0.0 && rand::thread_rng().gen::<f64>() < p {
        match components.memory.cleanup(components.config.memory.max_count) {
            Ok(deleted) => tracing::info!(deleted, "maintenance cleanup"),
            Err(e) => tracing::warn!(error = %e, "maintenance cleanup failed"),
        }
    }
}
