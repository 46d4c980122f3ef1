use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载数据并反序列化为指定类型
pub async fn load_toml<T: DeserializeOwned>(toml_file_path: &Path) -> Result<T> {
    if !toml_file_path.exists() {
        anyhow::bail!("文件不存在: {}", toml_file_path.display());
    }

    let content = fs::read_to_string(toml_file_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", toml_file_path.display()))?;

    let value: T = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", toml_file_path.display()))?;

    tracing::debug!("已加载配置文件: {}", toml_file_path.display());

    Ok(value)
}
