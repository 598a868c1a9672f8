use serde::{Deserialize, Serialize};

use crate::models::entry::ChoiceLetter;

/// 流式过程中得到的部分结果，任何字段都可能尚未出现
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialAiAnswer {
    #[serde(default)]
    pub ai_answer_multiple_choice: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default)]
    pub key_points: Option<Vec<String>>,
}

/// 累积后的 AI 回答
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAnswer {
    pub ai_answer_multiple_choice: String,
    pub explanation: String,
    pub solution: String,
    pub key_points: Vec<String>,
}

impl AiAnswer {
    pub fn letter(&self) -> Option<ChoiceLetter> {
        ChoiceLetter::parse(&self.ai_answer_multiple_choice)
    }

    pub fn is_empty(&self) -> bool {
        self.ai_answer_multiple_choice.is_empty()
            && self.explanation.is_empty()
            && self.solution.is_empty()
            && self.key_points.is_empty()
    }
}
