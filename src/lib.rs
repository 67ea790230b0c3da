//! Magpie - 工具调用型对话智能体
//!
//! 模块划分：
//! - **agent**: 无界面运行时（组件装配、按线程驱动一轮）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、推理/行动状态机（挂起/恢复、步数上限）
//! - **llm**: 推理与嵌入能力（OpenAI 兼容 / Mock / 确定性哈希嵌入）
//! - **memory**: 会话线程与检查点、embedding 索引的长期记忆存储
//! - **reflect**: 对话结束后的自动记忆判断（写入门控）
//! - **tools**: 工具注册表/调度与内置工具
//! - **observability**: tracing 初始化

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod reflect;
pub mod tools;
