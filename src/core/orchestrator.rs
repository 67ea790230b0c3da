//! Agent 编排器：推理/行动状态机
//!
//! 显式四态循环（Reasoning / AwaitingToolExecution /
//! AwaitingHumanConfirmation / Terminal），以有界步数计数取代无界递归。
//! 路由只看最新 assistant 消息是否携带非空 tool_calls，别无其他信号；
//! 高危工具在执行前挂起，挂起状态整体随 Thread 序列化，恢复只需要
//! 一个确认 token。工具失败一律转成 Observation 回流；LLM 本身的失败
//! 不在此捕获，直接向上传播。

use std::sync::Arc;

use serde_json::json;

use crate::core::AgentError;
use crate::llm::ChatClient;
use crate::memory::{Message, PendingConfirmation, Thread, ToolCall};
use crate::reflect::ReflectionEngine;
use crate::tools::ToolRegistry;

/// 步数耗尽时的哨兵回答（不是异常）
pub const CYCLE_LIMIT_ANSWER: &str =
    "Maximum reasoning cycles exceeded without reaching a final answer.";

/// 状态机的四个状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Reasoning,
    AwaitingToolExecution,
    AwaitingHumanConfirmation,
    Terminal,
}

/// 路由结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// 最新 assistant 消息携带非空 tool_calls
    ExecuteTools,
    /// 没有 tool_calls：响应内容即最终回答
    Finish,
}

/// 纯路由函数：下一状态只由 tool_calls 是否非空决定
pub fn route(tool_calls: &[ToolCall]) -> Route {
    if tool_calls.is_empty() {
        Route::Finish
    } else {
        Route::ExecuteTools
    }
}

/// 单条执行轨迹（仅用于日志与测试，不持久化）
#[derive(Debug, Clone)]
pub struct Trace {
    pub tool_name: String,
    pub args: serde_json::Value,
    pub observation: String,
}

/// 一次 run 的轨迹
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub question: String,
    pub traces: Vec<Trace>,
    pub final_answer: Option<String>,
}

impl Trajectory {
    fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            traces: Vec::new(),
            final_answer: None,
        }
    }
}

/// 一轮驱动的外部可见结果
#[derive(Debug)]
pub enum TurnOutcome {
    /// 到达终态；answer 为最终回答（可能是哨兵失败回答）
    Completed {
        answer: String,
        trajectory: Trajectory,
    },
    /// 挂起等待确认；prompt 为给人看的确认文案
    AwaitingConfirmation { prompt: String },
}

/// 编排器：持有推理能力、工具注册表与可选的反思引擎（全部注入，无全局量）。
/// 每个实例一次只驱动一个 Thread；注册表与记忆存储可跨线程共享。
pub struct Orchestrator {
    chat: Arc<dyn ChatClient>,
    tools: Arc<ToolRegistry>,
    reflection: Option<Arc<ReflectionEngine>>,
    max_cycles: usize,
}

impl Orchestrator {
    pub fn new(chat: Arc<dyn ChatClient>, tools: Arc<ToolRegistry>, max_cycles: usize) -> Self {
        Self {
            chat,
            tools,
            reflection: None,
            max_cycles,
        }
    }

    pub fn with_reflection(mut self, reflection: Arc<ReflectionEngine>) -> Self {
        self.reflection = Some(reflection);
        self
    }

    /// 处理一条用户消息：新 run 从 Reasoning 起步，步数清零
    pub async fn run_turn(
        &self,
        thread: &mut Thread,
        user_input: &str,
    ) -> Result<TurnOutcome, AgentError> {
        thread.cycles_used = 0;
        thread.push_message(Message::user(user_input));
        self.drive(thread, AgentState::Reasoning).await
    }

    /// 恢复挂起的线程。token 为 "y" 时执行挂起的调用（恰好一次）；
    /// 其余任何值追加 {status: "cancelled"} 结果且无副作用。
    /// 随后继续处理剩余队列。
    pub async fn resume(&self, thread: &mut Thread, token: &str) -> Result<TurnOutcome, AgentError> {
        let pending = thread.suspended.take().ok_or(AgentError::NotSuspended)?;
        let call = pending.call;
        if token.trim() == "y" {
            tracing::info!(tool = %call.name, "confirmed, executing pending call");
            let observation = self.tools.call(&call.name, call.arguments.clone()).await?;
            thread.push_message(Message::tool(call.id, observation.to_string()));
        } else {
            tracing::info!(tool = %call.name, "denied, pending call cancelled");
            let cancelled = json!({"status": "cancelled", "reason": "user denied confirmation"});
            thread.push_message(Message::tool(call.id, cancelled.to_string()));
        }
        self.drive(thread, AgentState::AwaitingToolExecution).await
    }

    /// 状态机主循环；每次转移只依赖 (当前状态, 外部响应)
    async fn drive(
        &self,
        thread: &mut Thread,
        mut state: AgentState,
    ) -> Result<TurnOutcome, AgentError> {
        let question = thread.last_user_content().unwrap_or_default().to_string();
        let mut trajectory = Trajectory::new(&question);
        let mut final_answer: Option<String> = None;

        loop {
            match state {
                AgentState::Reasoning => {
                    if thread.cycles_used >= self.max_cycles {
                        tracing::warn!(max_cycles = self.max_cycles, "cycle limit exceeded");
                        final_answer = Some(CYCLE_LIMIT_ANSWER.to_string());
                        state = AgentState::Terminal;
                        continue;
                    }
                    thread.cycles_used += 1;

                    let response = self
                        .chat
                        .chat(thread.messages(), &self.tools.catalogue())
                        .await?;

                    state = match route(&response.tool_calls) {
                        Route::ExecuteTools => {
                            thread.push_message(Message::assistant_with_calls(
                                response.content.unwrap_or_default(),
                                response.tool_calls.clone(),
                            ));
                            thread.pending_calls = response.tool_calls.into();
                            AgentState::AwaitingToolExecution
                        }
                        Route::Finish => {
                            let answer = response.content.unwrap_or_default();
                            thread.push_message(Message::assistant(answer.clone()));
                            final_answer = Some(answer);
                            AgentState::Terminal
                        }
                    };
                }

                AgentState::AwaitingToolExecution => {
                    // 严格按序处理队列；高危调用挂起并保留剩余队列
                    state = loop {
                        let Some(call) = thread.pending_calls.pop_front() else {
                            break AgentState::Reasoning;
                        };
                        let tool = self
                            .tools
                            .get(&call.name)
                            .ok_or_else(|| AgentError::UnknownTool(call.name.clone()))?;
                        if tool.risky() {
                            thread.suspended = Some(PendingConfirmation { call });
                            break AgentState::AwaitingHumanConfirmation;
                        }
                        let observation =
                            self.tools.call(&call.name, call.arguments.clone()).await?;
                        let serialized = observation.to_string();
                        trajectory.traces.push(Trace {
                            tool_name: call.name.clone(),
                            args: call.arguments.clone(),
                            observation: serialized.clone(),
                        });
                        // 每个调用恰好一条结果消息，靠 id 对应
                        thread.push_message(Message::tool(call.id, serialized));
                    };
                }

                AgentState::AwaitingHumanConfirmation => {
                    let Some(pending) = &thread.suspended else {
                        return Err(AgentError::NotSuspended);
                    };
                    return Ok(TurnOutcome::AwaitingConfirmation {
                        prompt: confirmation_prompt(&pending.call),
                    });
                }

                AgentState::Terminal => {
                    let answer = final_answer.take().unwrap_or_default();
                    trajectory.final_answer = Some(answer.clone());
                    tracing::debug!(
                        question = %trajectory.question,
                        steps = trajectory.traces.len(),
                        "run complete"
                    );
                    if let Some(reflection) = &self.reflection {
                        reflection.reflect(&question, &answer).await?;
                    }
                    return Ok(TurnOutcome::Completed { answer, trajectory });
                }
            }
        }
    }
}

/// 给人看的确认文案：说明将要执行什么
fn confirmation_prompt(call: &ToolCall) -> String {
    format!(
        "Execute tool '{}' with arguments {}? [y/N]",
        call.name, call.arguments
    )
}
