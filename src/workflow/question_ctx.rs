//! 题目处理上下文
//!
//! 封装"例程正在回答哪道题、有哪些候选答案"这一信息

use std::fmt::Display;
use std::time::Duration;

use serde_json::Value as JsonValue;

use crate::error::RoutineError;
use crate::models::{AnswerId, AnswerOption, Question};

/// 题目处理上下文
///
/// 包含单个例程所需的全部输入
#[derive(Debug, Clone)]
pub struct QuestionCtx {
    /// 题目 ID
    pub question_id: String,

    /// 候选答案
    pub answers: Vec<AnswerOption>,

    /// 题目附带的 metadata
    pub metadata: JsonValue,

    /// 轮询类例程的最长等待时间
    pub poll_budget: Duration,

    /// 轮询间隔
    pub poll_interval: Duration,
}

impl QuestionCtx {
    /// 创建新的题目上下文
    pub fn new(question: &Question, poll_interval: Duration, poll_budget: Duration) -> Self {
        Self {
            question_id: question.question_id.clone(),
            answers: question.answers.clone(),
            metadata: question.metadata.clone(),
            poll_budget,
            poll_interval,
        }
    }

    /// metadata 中 `sender` / `receiver` 的 label
    pub fn metadata_label(&self, key: &'static str) -> Result<String, RoutineError> {
        self.metadata
            .get(key)
            .and_then(|v| v.get("label"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or(RoutineError::MissingMetadata(key))
    }

    /// 标签完全相同的候选答案
    pub fn answer_id_for(&self, label: &str) -> Option<AnswerId> {
        self.answers
            .iter()
            .find(|a| a.display_label() == Some(label))
            .map(|a| a.answer_id.clone())
    }

    /// 标签出现在 `observed` 中的候选答案，按候选顺序
    pub fn answer_ids_for<S: AsRef<str>>(&self, observed: &[S]) -> Vec<AnswerId> {
        self.answers
            .iter()
            .filter(|a| {
                a.display_label()
                    .map(|label| observed.iter().any(|o| o.as_ref() == label))
                    .unwrap_or(false)
            })
            .map(|a| a.answer_id.clone())
            .collect()
    }
}

impl Display for QuestionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.question_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(metadata: JsonValue) -> QuestionCtx {
        let answers: Vec<AnswerOption> = serde_json::from_value(json!([
            {"answer_id": 1, "resource": {"label": "Sender A"}},
            {"answer_id": 2, "resource": {"label": "Sender B"}},
            {"answer_id": 3, "label": "Sender C"}
        ]))
        .unwrap();
        QuestionCtx {
            question_id: "test_03".to_string(),
            answers,
            metadata,
            poll_budget: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_match_is_exact() {
        let c = ctx(json!({}));
        let ids = c.answer_ids_for(&["Sender B", "Sender A", "sender c", "Other"]);
        assert_eq!(ids, vec![AnswerId::from(1), AnswerId::from(2)]);
        assert_eq!(c.answer_id_for("Sender C"), Some(AnswerId::from(3)));
        assert_eq!(c.answer_id_for("Sender"), None);
    }

    #[test]
    fn test_metadata_label() {
        let c = ctx(json!({"receiver": {"id": "r1", "label": "Receiver 1"}}));
        assert_eq!(c.metadata_label("receiver").unwrap(), "Receiver 1");
        assert!(matches!(
            c.metadata_label("sender"),
            Err(RoutineError::MissingMetadata("sender"))
        ));
        assert_eq!(c.to_string(), "[test_03]");
    }
}
