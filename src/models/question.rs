//! 题目与答案的数据模型
//!
//! 与测试套件之间的 JSON 协议在这里定义

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::StoreError;

/// 入站题目必须包含的字段
pub const REQUIRED_FIELDS: [&str; 9] = [
    "test_type",
    "question_id",
    "name",
    "description",
    "question",
    "answers",
    "timeout",
    "answer_uri",
    "metadata",
];

/// 开始测试前的确认消息
pub const PRE_TESTS_MESSAGE: &str = "pre_tests_message";
/// 测试全部结束的确认消息
pub const POST_TESTS_MESSAGE: &str = "post_tests_message";

/// 题目类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TestType {
    /// 只需执行操作并点击 Next
    Action,
    /// 单选
    SingleChoice,
    /// 多选
    MultiChoice,
    /// 未知类型，原样保留
    Other(String),
}

impl From<String> for TestType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "action" => TestType::Action,
            "single_choice" => TestType::SingleChoice,
            "multi_choice" => TestType::MultiChoice,
            _ => TestType::Other(s),
        }
    }
}

impl From<TestType> for String {
    fn from(t: TestType) -> Self {
        match t {
            TestType::Action => "action".to_string(),
            TestType::SingleChoice => "single_choice".to_string(),
            TestType::MultiChoice => "multi_choice".to_string(),
            TestType::Other(s) => s,
        }
    }
}

/// 候选答案 ID，字符串或数字都原样回传
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerId(pub JsonValue);

impl From<&str> for AnswerId {
    fn from(s: &str) -> Self {
        AnswerId(JsonValue::String(s.to_string()))
    }
}

impl From<i64> for AnswerId {
    fn from(n: i64) -> Self {
        AnswerId(JsonValue::from(n))
    }
}

/// 候选答案关联的 NMOS 资源
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// 候选答案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub answer_id: AnswerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceRef>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl AnswerOption {
    /// 用于和界面比对的标签：优先 resource.label，其次 label
    pub fn display_label(&self) -> Option<&str> {
        self.resource
            .as_ref()
            .and_then(|r| r.label.as_deref())
            .or(self.label.as_deref())
    }
}

/// 测试套件发来的一道题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub test_type: TestType,
    pub question_id: String,
    pub name: String,
    pub description: String,
    pub question: String,
    pub answers: Vec<AnswerOption>,
    /// 秒
    pub timeout: f64,
    pub answer_uri: String,
    pub metadata: JsonValue,
}

impl Question {
    /// 从入站 JSON 解析题目，缺少字段时返回 `Missing <field>`
    pub fn from_json(body: &JsonValue) -> Result<Self, StoreError> {
        let object = body
            .as_object()
            .ok_or_else(|| StoreError::Validation("Invalid JSON received".to_string()))?;

        if let Some(field) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
            return Err(StoreError::Validation(format!("Missing {}", field)));
        }

        serde_json::from_value(body.clone())
            .map_err(|e| StoreError::Validation(format!("Invalid JSON received: {}", e)))
    }

    /// 是否为开始/结束确认消息
    pub fn is_lifecycle_marker(&self) -> bool {
        self.question_id == PRE_TESTS_MESSAGE || self.question_id == POST_TESTS_MESSAGE
    }
}

/// 判断 `clear` 标记是否为真
pub fn is_clear_request(body: &JsonValue) -> bool {
    match body.get("clear") {
        None | Some(JsonValue::Null) => false,
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => {
            let s = s.trim();
            !s.is_empty() && !s.eq_ignore_ascii_case("false") && s != "0"
        }
        Some(JsonValue::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Some(JsonValue::Array(a)) => !a.is_empty(),
        Some(JsonValue::Object(o)) => !o.is_empty(),
    }
}

/// 例程给出的答案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerResponse {
    /// 多选题的答案 ID 列表
    Choices(Vec<AnswerId>),
    /// 自由文本（例如 "Next"）
    Text(String),
    /// 单选题的答案 ID
    Choice(AnswerId),
}

/// 回调发送给测试套件的内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub question_id: String,
    pub answer_response: Option<AnswerResponse>,
}

/// 存储槽状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Empty,
    Active,
    Answered,
}

/// 展示用的当前题目（不含答案）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionView {
    pub status: SlotStatus,
    #[serde(flatten)]
    pub question: Option<Question>,
}
