//! 工具箱：注册表/调度 + 各能力实现

pub mod calculate;
pub mod clock;
pub mod memory_tools;
pub mod rag;
pub mod registry;
pub mod search;

pub use calculate::CalculateTool;
pub use clock::ClockTool;
pub use memory_tools::{ReadMemoryTool, WriteMemoryTool};
pub use rag::{ingest_document, RagSearchTool};
pub use registry::{parse_args, CatalogueEntry, Tool, ToolFailure, ToolRegistry};
pub use search::WebSearchTool;
