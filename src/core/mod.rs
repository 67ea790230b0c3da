//! 核心编排层：错误类型与推理/行动状态机

pub mod error;
pub mod orchestrator;

pub use error::AgentError;
pub use orchestrator::{
    route, AgentState, Orchestrator, Route, Trace, Trajectory, TurnOutcome, CYCLE_LIMIT_ANSWER,
};
