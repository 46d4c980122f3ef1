//! 测试套件例程表
//!
//! 启动时按 `--suite` 构建，题目 ID 精确匹配

use std::collections::HashMap;

use crate::models::SuiteKind;
use crate::services::ResourcePage;
use crate::workflow::routine::Routine;
use crate::workflow::scratch::Scratchpad;

const SENDERS_THEN_RECEIVERS: &[ResourcePage] = &[ResourcePage::Senders, ResourcePage::Receivers];

/// 一个测试套件的全部例程
#[derive(Debug)]
pub struct TestSuite {
    kind: SuiteKind,
    routines: HashMap<&'static str, Routine>,
    scratch: Scratchpad,
}

impl TestSuite {
    pub fn new(kind: SuiteKind) -> Self {
        let routines = match kind {
            SuiteKind::Is0404 => is_04_04(),
            SuiteKind::Is0503 => is_05_03(),
        };
        Self {
            kind,
            routines: routines.into_iter().collect(),
            scratch: Scratchpad::new(),
        }
    }

    pub fn kind(&self) -> SuiteKind {
        self.kind
    }

    pub fn routine(&self, question_id: &str) -> Option<Routine> {
        self.routines.get(question_id).copied()
    }

    pub fn scratch(&self) -> &Scratchpad {
        &self.scratch
    }

    /// 已注册的题目 ID（排序后）
    pub fn question_ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.routines.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

fn is_04_04() -> Vec<(&'static str, Routine)> {
    vec![
        ("test_01", Routine::Informational("NMOS-js does not use DNS-SD to find registry")),
        ("test_02", Routine::Browse(SENDERS_THEN_RECEIVERS)),
        ("test_03", Routine::MatchListed(ResourcePage::Senders)),
        ("test_04", Routine::MatchListed(ResourcePage::Receivers)),
        (
            "test_05",
            Routine::CaptureListed {
                page: ResourcePage::Senders,
                slot: "test_05",
            },
        ),
        (
            "test_05_1",
            Routine::SelectVanished {
                page: ResourcePage::Senders,
                baseline: "test_05",
                slot: "test_05_1",
            },
        ),
        (
            "test_05_2",
            Routine::AwaitReturn {
                page: ResourcePage::Senders,
                baseline: "test_05",
                returned: "test_05_1",
            },
        ),
    ]
}

fn is_05_03() -> Vec<(&'static str, Routine)> {
    vec![
        ("test_01", Routine::ConnectableReceivers),
        ("test_02", Routine::Connect),
        ("test_03", Routine::Disconnect),
        ("test_04", Routine::ActiveReceiver),
        ("test_04_1", Routine::ConnectedSender),
        ("test_04_2", Routine::AwaitDisconnect),
    ]
}
