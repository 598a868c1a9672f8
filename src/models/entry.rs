//! 题目条目（Entry）及其表单结构
//!
//! `EntryDraft` 是唯一的表单结构，自动保存、显式保存和数据库写入都使用它。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::subject::{deserialize_optional_subject, Subject};

/// 每道题固定的选项数量
pub const CHOICE_COUNT: usize = 4;

/// 选项字母
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceLetter {
    A,
    B,
    C,
    D,
}

impl ChoiceLetter {
    pub const ALL: [ChoiceLetter; CHOICE_COUNT] =
        [ChoiceLetter::A, ChoiceLetter::B, ChoiceLetter::C, ChoiceLetter::D];

    /// 选项下标（从 0 开始）
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChoiceLetter::A => "A",
            ChoiceLetter::B => "B",
            ChoiceLetter::C => "C",
            ChoiceLetter::D => "D",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 宽松解析：取第一个字母字符，忽略大小写（"b"、"B."、" C) " 都可以）
    pub fn parse(s: &str) -> Option<Self> {
        let first = s.trim().chars().find(|c| c.is_ascii_alphabetic())?;
        match first.to_ascii_uppercase() {
            'A' => Some(ChoiceLetter::A),
            'B' => Some(ChoiceLetter::B),
            'C' => Some(ChoiceLetter::C),
            'D' => Some(ChoiceLetter::D),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChoiceLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    InProgress,
    Submitted,
}

impl EntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::InProgress => "in_progress",
            EntryStatus::Submitted => "submitted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(EntryStatus::InProgress),
            "submitted" => Some(EntryStatus::Submitted),
            _ => None,
        }
    }
}

/// 四个答案选项
///
/// 表单可能传入少于四个（新建时为 `[]`），缺少的补空；多于四个时拒绝。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AnswerChoices([String; CHOICE_COUNT]);

impl AnswerChoices {
    pub fn new(choices: [String; CHOICE_COUNT]) -> Self {
        Self(choices)
    }

    /// 四个选项是否都已填写
    pub fn all_filled(&self) -> bool {
        self.0.iter().all(|c| !c.trim().is_empty())
    }

    pub fn get(&self, letter: ChoiceLetter) -> &str {
        &self.0[letter.index()]
    }

    /// 按 (字母, 内容) 遍历
    pub fn lettered(&self) -> impl Iterator<Item = (ChoiceLetter, &str)> {
        ChoiceLetter::ALL
            .into_iter()
            .zip(self.0.iter().map(String::as_str))
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.to_vec()
    }
}

impl TryFrom<Vec<String>> for AnswerChoices {
    type Error = AppError;

    fn try_from(values: Vec<String>) -> AppResult<Self> {
        if values.len() > CHOICE_COUNT {
            return Err(AppError::validation(
                "answerChoices",
                format!("最多 {} 个选项，收到 {} 个", CHOICE_COUNT, values.len()),
            ));
        }

        let mut choices: [String; CHOICE_COUNT] = Default::default();
        for (slot, value) in choices.iter_mut().zip(values) {
            *slot = value;
        }
        Ok(Self(choices))
    }
}

impl From<AnswerChoices> for Vec<String> {
    fn from(choices: AnswerChoices) -> Self {
        choices.0.into()
    }
}

/// 条目表单
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntryDraft {
    #[serde(deserialize_with = "deserialize_optional_subject")]
    pub subject: Option<Subject>,
    pub question: String,
    /// 示意图 URL
    #[serde(deserialize_with = "deserialize_optional_text")]
    pub image: Option<String>,
    pub answer_choices: AnswerChoices,
    /// 正确答案字母
    #[serde(deserialize_with = "deserialize_optional_letter")]
    pub answer_multiple_choice: Option<ChoiceLetter>,
    pub answer_long: String,
    pub hint: String,
}

impl EntryDraft {
    /// 草稿校验：只检查"选项填满后才能设置正确答案"
    pub fn validate_draft(&self) -> AppResult<()> {
        if self.answer_multiple_choice.is_some() && !self.answer_choices.all_filled() {
            return Err(AppError::validation(
                "answerMultipleChoice",
                "四个选项都填写后才能设置正确答案",
            ));
        }
        Ok(())
    }

    /// 提交校验：除示意图外的所有字段都必须填写
    pub fn validate_complete(&self) -> AppResult<()> {
        self.validate_draft()?;

        if self.subject.is_none() {
            return Err(AppError::validation("subject", "Subject required"));
        }
        if self.question.trim().is_empty() {
            return Err(AppError::validation("question", "Question required"));
        }
        if let Some((letter, _)) = self.answer_choices.lettered().find(|(_, c)| c.trim().is_empty()) {
            return Err(AppError::validation(
                "answerChoices",
                format!("Choice {} required", letter),
            ));
        }
        if self.answer_multiple_choice.is_none() {
            return Err(AppError::validation("answerMultipleChoice", "Answer required"));
        }
        if self.answer_long.trim().is_empty() {
            return Err(AppError::validation("answerLong", "Answer required"));
        }
        if self.hint.trim().is_empty() {
            return Err(AppError::validation("hint", "Hint required"));
        }
        Ok(())
    }
}

/// 题目条目
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub entry_id: Uuid,
    pub user_id: String,
    pub subject: Option<Subject>,
    pub question: String,
    pub image: Option<String>,
    pub answer_choices: AnswerChoices,
    pub answer_multiple_choice: Option<ChoiceLetter>,
    pub answer_long: String,
    pub hint: String,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    /// 为用户创建空白条目
    pub fn new_blank(user_id: impl Into<String>) -> Self {
        let now = crate::models::now();
        Self {
            entry_id: Uuid::new_v4(),
            user_id: user_id.into(),
            subject: None,
            question: String::new(),
            image: None,
            answer_choices: AnswerChoices::default(),
            answer_multiple_choice: None,
            answer_long: String::new(),
            hint: String::new(),
            status: EntryStatus::InProgress,
            created_at: now,
            updated_at: now,
        }
    }

    /// 正确答案选择器是否可用
    pub fn can_select_correct_answer(&self) -> bool {
        self.answer_choices.all_filled()
    }

    /// 当前表单内容
    pub fn draft(&self) -> EntryDraft {
        EntryDraft {
            subject: self.subject,
            question: self.question.clone(),
            image: self.image.clone(),
            answer_choices: self.answer_choices.clone(),
            answer_multiple_choice: self.answer_multiple_choice,
            answer_long: self.answer_long.clone(),
            hint: self.hint.clone(),
        }
    }

    /// 用表单内容覆盖条目（调用方负责校验）
    pub fn apply_draft(&mut self, draft: EntryDraft) {
        self.subject = draft.subject;
        self.question = draft.question;
        self.image = draft.image;
        self.answer_choices = draft.answer_choices;
        self.answer_multiple_choice = draft.answer_multiple_choice;
        self.answer_long = draft.answer_long;
        self.hint = draft.hint;
        self.updated_at = crate::models::now();
    }
}

fn deserialize_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.trim().is_empty()))
}

fn deserialize_optional_letter<'de, D>(deserializer: D) -> Result<Option<ChoiceLetter>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => ChoiceLetter::parse(s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid answer letter: {}", s))),
    }
}
