use crate::error::ConfigError;

/// 测试套件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuiteKind {
    /// IS-04 Query API 发现
    Is0404,
    /// IS-05 连接管理
    Is0503,
}

impl SuiteKind {
    pub const ALL: [SuiteKind; 2] = [SuiteKind::Is0404, SuiteKind::Is0503];

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            SuiteKind::Is0404 => "IS-04-04",
            SuiteKind::Is0503 => "IS-05-03",
        }
    }

    /// 从命令行参数解析（精确匹配，忽略大小写）
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownSuite(s.to_string()))
    }
}

impl std::fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
