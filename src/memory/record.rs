//! 长期记忆的记录类型
//!
//! 记录的 embedding 由存储持有（对外不透明），这里只描述元数据形态。

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::AgentError;

/// 记忆类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MemoryType {
    /// 用户画像：称呼、偏好、长期目标
    Profile,
    /// 情景：某次对话/事件的要点
    Episodic,
    /// 知识：可复用的事实性内容
    Knowledge,
}

impl MemoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Profile => "profile",
            MemoryType::Episodic => "episodic",
            MemoryType::Knowledge => "knowledge",
        }
    }
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryType {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(MemoryType::Profile),
            "episodic" => Ok(MemoryType::Episodic),
            "knowledge" => Ok(MemoryType::Knowledge),
            other => Err(AgentError::InvalidMemoryType(other.to_string())),
        }
    }
}

/// 检索过滤器："all" 表示不过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryFilter {
    All,
    Only(MemoryType),
}

impl MemoryFilter {
    pub fn matches(&self, memory_type: MemoryType) -> bool {
        match self {
            MemoryFilter::All => true,
            MemoryFilter::Only(t) => *t == memory_type,
        }
    }
}

impl FromStr for MemoryFilter {
    type Err = AgentError;

    /// 非法取值是注册表误用级别的致命错误；工具边界用类型化输入
    /// 把同样的取值错误降级为可恢复的 validation_error。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(MemoryFilter::All)
        } else {
            Ok(MemoryFilter::Only(s.parse()?))
        }
    }
}

/// 持久化的记忆记录（embedding 省略，归存储所有）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// uuid v7：全局唯一且按生成顺序可比
    pub id: Uuid,
    pub content: String,
    pub memory_type: MemoryType,
    /// 重要度 1（低）~ 5（高）
    pub importance: u8,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

/// 一次语义检索命中：记录元数据 + 相似度
#[derive(Debug, Clone, Serialize)]
pub struct RecallHit {
    #[serde(flatten)]
    pub record: MemoryRecord,
    pub score: f32,
}

/// write 的返回值（wire 形态固定）
#[derive(Debug, Clone, Serialize)]
pub struct WriteReceipt {
    pub status: &'static str,
    pub memory_id: Uuid,
    pub content: String,
    pub memory_type: MemoryType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parses_all_and_types() {
        assert_eq!("all".parse::<MemoryFilter>().unwrap(), MemoryFilter::All);
        assert_eq!(
            "profile".parse::<MemoryFilter>().unwrap(),
            MemoryFilter::Only(MemoryType::Profile)
        );
        assert!(matches!(
            "bogus".parse::<MemoryFilter>(),
            Err(AgentError::InvalidMemoryType(_))
        ));
    }

    #[test]
    fn filter_matching() {
        assert!(MemoryFilter::All.matches(MemoryType::Knowledge));
        assert!(MemoryFilter::Only(MemoryType::Profile).matches(MemoryType::Profile));
        assert!(!MemoryFilter::Only(MemoryType::Profile).matches(MemoryType::Episodic));
    }
}
