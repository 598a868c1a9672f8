pub mod ai_answer;
pub mod entry;
pub mod subject;
pub mod submission;

pub use ai_answer::{AiAnswer, PartialAiAnswer};
pub use entry::{AnswerChoices, ChoiceLetter, Entry, EntryDraft, EntryStatus, CHOICE_COUNT};
pub use subject::Subject;
pub use submission::{Submission, SubmissionStatus, SubmissionUpdate};

use chrono::{DateTime, SubsecRound, Utc};

/// 当前时间，精度截到微秒（与数据库存储精度一致）
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
