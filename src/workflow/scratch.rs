//! 多段题目的共享数据
//!
//! 例如 test_05 记下发送端列表，test_05_1 读取并写入离线的发送端，test_05_2 再读取

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::RoutineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScratchValue {
    Labels(Vec<String>),
    Label(String),
}

/// 按题目 ID 存取的共享数据
#[derive(Debug, Default)]
pub struct Scratchpad {
    slots: Mutex<HashMap<String, ScratchValue>>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, value: ScratchValue) {
        self.slots
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<ScratchValue> {
        self.slots.lock().unwrap_or_else(|p| p.into_inner()).get(key).cloned()
    }

    pub fn labels(&self, key: &str) -> Result<Vec<String>, RoutineError> {
        match self.get(key) {
            Some(ScratchValue::Labels(labels)) => Ok(labels),
            _ => Err(RoutineError::MissingScratch(key.to_string())),
        }
    }

    pub fn label(&self, key: &str) -> Result<String, RoutineError> {
        match self.get(key) {
            Some(ScratchValue::Label(label)) => Ok(label),
            _ => Err(RoutineError::MissingScratch(key.to_string())),
        }
    }

    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}
