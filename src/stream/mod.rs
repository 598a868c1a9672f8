//! 流式 AI 回答的增量解析与累积

pub mod partial_json;
pub mod reducer;

pub use partial_json::{parse_partial, PartialJsonParser};
pub use reducer::{fold, reduce};
