use crate::models::{AiAnswer, PartialAiAnswer};

/// 把一个部分结果合并进已累积的回答
///
/// 非空字段覆盖旧值；缺失或为空的字段保留旧值，避免已显示的内容倒退。
pub fn reduce(mut prev: AiAnswer, partial: &PartialAiAnswer) -> AiAnswer {
    merge_text(&mut prev.ai_answer_multiple_choice, &partial.ai_answer_multiple_choice);
    merge_text(&mut prev.explanation, &partial.explanation);
    merge_text(&mut prev.solution, &partial.solution);

    if let Some(points) = &partial.key_points {
        if !points.is_empty() {
            prev.key_points = points.clone();
        }
    }
    prev
}

/// 依次合并一串部分结果
pub fn fold<'a, I>(partials: I) -> AiAnswer
where
    I: IntoIterator<Item = &'a PartialAiAnswer>,
{
    partials.into_iter().fold(AiAnswer::default(), reduce)
}

fn merge_text(slot: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        if !value.is_empty() {
            slot.clone_from(value);
        }
    }
}
