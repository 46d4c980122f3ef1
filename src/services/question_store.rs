//! 题目存储 - 业务能力层
//!
//! 单槽存储：同一时间只保存一道题目及其答案
//!
//! 状态：Empty → Active → Answered → Empty

use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::StoreError;
use crate::models::{AnswerPayload, AnswerResponse, Question, QuestionView, SlotStatus};

/// 提交题目时发放的凭证
///
/// 执行线程用它记录答案；题目被清空或替换后凭证失效
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    question_id: String,
}

impl Ticket {
    pub fn question_id(&self) -> &str {
        &self.question_id
    }
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    question: Question,
    /// `Some(..)` 表示已记录答案（答案本身可以为 null）
    answer: Option<Option<AnswerResponse>>,
}

#[derive(Debug, Default)]
struct Inner {
    next_generation: u64,
    slot: Option<Slot>,
}

/// 题目存储
///
/// 所有操作共用一把锁，HTTP 处理和执行线程可以同时访问
#[derive(Debug, Default)]
pub struct QuestionStore {
    inner: Mutex<Inner>,
}

impl QuestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 保存新题目
    ///
    /// 上一道题目的答案尚未投递时返回 `Busy`
    pub fn submit(&self, question: Question) -> Result<Ticket, StoreError> {
        let mut inner = self.lock();

        if let Some(slot) = &inner.slot {
            return Err(StoreError::Busy {
                question_id: slot.question.question_id.clone(),
            });
        }

        inner.next_generation += 1;
        let ticket = Ticket {
            generation: inner.next_generation,
            question_id: question.question_id.clone(),
        };
        debug!("保存题目 {} (generation {})", ticket.question_id, ticket.generation);

        inner.slot = Some(Slot {
            generation: ticket.generation,
            question,
            answer: None,
        });
        Ok(ticket)
    }

    /// 清空存储，丢弃未投递的答案；重复调用无副作用
    pub fn clear(&self) {
        let mut inner = self.lock();
        if let Some(slot) = inner.slot.take() {
            debug!("清空题目 {}", slot.question.question_id);
        }
    }

    /// 记录答案
    pub fn record_answer(&self, ticket: &Ticket, response: Option<AnswerResponse>) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let slot = Self::slot_for(&mut inner, ticket)?;
        if slot.answer.is_some() {
            return Err(StoreError::NoActiveQuestion);
        }
        slot.answer = Some(response);
        Ok(())
    }

    /// 构建回调内容
    pub fn answer_payload(&self, ticket: &Ticket) -> Result<AnswerPayload, StoreError> {
        let mut inner = self.lock();
        let slot = Self::slot_for(&mut inner, ticket)?;
        match &slot.answer {
            Some(response) => Ok(AnswerPayload {
                question_id: slot.question.question_id.clone(),
                answer_response: response.clone(),
            }),
            None => Err(StoreError::NoAnswerRecorded),
        }
    }

    /// 回调已发送（无论成功与否），释放存储槽
    pub fn mark_dispatched(&self, ticket: &Ticket) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let slot = Self::slot_for(&mut inner, ticket)?;
        if slot.answer.is_none() {
            return Err(StoreError::NoAnswerRecorded);
        }
        inner.slot = None;
        Ok(())
    }

    /// 展示用的当前题目
    pub fn current_question_view(&self) -> QuestionView {
        let inner = self.lock();
        QuestionView {
            status: Self::status_of(&inner),
            question: inner.slot.as_ref().map(|slot| slot.question.clone()),
        }
    }

    pub fn status(&self) -> SlotStatus {
        Self::status_of(&self.lock())
    }

    fn status_of(inner: &Inner) -> SlotStatus {
        match &inner.slot {
            None => SlotStatus::Empty,
            Some(Slot { answer: None, .. }) => SlotStatus::Active,
            Some(Slot { answer: Some(_), .. }) => SlotStatus::Answered,
        }
    }

    fn slot_for<'a>(inner: &'a mut Inner, ticket: &Ticket) -> Result<&'a mut Slot, StoreError> {
        match inner.slot.as_mut() {
            Some(slot) if slot.generation == ticket.generation => Ok(slot),
            _ => Err(StoreError::NoActiveQuestion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnswerId, TestType};
    use serde_json::json;

    fn question(id: &str, uri: &str) -> Question {
        Question {
            test_type: TestType::Action,
            question_id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            question: String::new(),
            answers: Vec::new(),
            timeout: 10.0,
            answer_uri: uri.to_string(),
            metadata: json!({}),
        }
    }

    #[test]
    fn test_lifecycle() {
        let store = QuestionStore::new();
        assert_eq!(store.status(), SlotStatus::Empty);

        let ticket = store.submit(question("test_01", "http://a/")).unwrap();
        assert_eq!(store.status(), SlotStatus::Active);
        assert_eq!(store.answer_payload(&ticket), Err(StoreError::NoAnswerRecorded));

        store
            .record_answer(&ticket, Some(AnswerResponse::Text("Next".to_string())))
            .unwrap();
        assert_eq!(store.status(), SlotStatus::Answered);

        let payload = store.answer_payload(&ticket).unwrap();
        assert_eq!(payload.question_id, "test_01");
        assert_eq!(payload.answer_response, Some(AnswerResponse::Text("Next".to_string())));

        store.mark_dispatched(&ticket).unwrap();
        assert_eq!(store.status(), SlotStatus::Empty);
    }

    #[test]
    fn test_single_flight() {
        let store = QuestionStore::new();
        let a = store.submit(question("test_01", "http://a/")).unwrap();

        assert_eq!(
            store.submit(question("test_02", "http://b/")),
            Err(StoreError::Busy {
                question_id: "test_01".to_string()
            })
        );
        // 已记录但未投递时仍然拒绝
        store.record_answer(&a, None).unwrap();
        assert!(store.submit(question("test_02", "http://b/")).is_err());

        store.mark_dispatched(&a).unwrap();
        assert!(store.submit(question("test_02", "http://b/")).is_ok());
    }

    #[test]
    fn test_clear_idempotent() {
        let store = QuestionStore::new();
        store.clear();
        assert_eq!(store.status(), SlotStatus::Empty);

        let ticket = store.submit(question("test_01", "http://a/")).unwrap();
        store.record_answer(&ticket, Some(AnswerResponse::Choice(AnswerId::from(1)))).unwrap();
        store.clear();
        store.clear();
        assert_eq!(store.status(), SlotStatus::Empty);
        assert_eq!(store.current_question_view().question, None);
        assert_eq!(store.answer_payload(&ticket), Err(StoreError::NoActiveQuestion));
    }

    #[test]
    fn test_stale_ticket_cannot_record() {
        let store = QuestionStore::new();
        let old = store.submit(question("test_01", "http://a/")).unwrap();
        store.clear();
        let new = store.submit(question("test_02", "http://b/")).unwrap();

        assert_eq!(store.record_answer(&old, None), Err(StoreError::NoActiveQuestion));
        assert_eq!(store.status(), SlotStatus::Active);
        assert!(store.record_answer(&new, None).is_ok());
        assert_eq!(store.answer_payload(&new).unwrap().question_id, "test_02");
    }

    #[test]
    fn test_record_without_question() {
        let store = QuestionStore::new();
        let ticket = store.submit(question("test_01", "http://a/")).unwrap();
        store.clear();
        assert_eq!(store.record_answer(&ticket, None), Err(StoreError::NoActiveQuestion));
        assert_eq!(store.mark_dispatched(&ticket), Err(StoreError::NoActiveQuestion));
    }

    #[test]
    fn test_view_excludes_answer() {
        let store = QuestionStore::new();
        let ticket = store.submit(question("test_05", "http://a/")).unwrap();
        store.record_answer(&ticket, Some(AnswerResponse::Text("Next".to_string()))).unwrap();

        let view = serde_json::to_value(store.current_question_view()).unwrap();
        assert_eq!(view["status"], json!("answered"));
        assert_eq!(view["question_id"], json!("test_05"));
        assert!(view.get("answer_response").is_none());
    }
}
