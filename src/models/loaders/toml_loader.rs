use std::collections::HashSet;
use std::path::Path;

use tokio::fs;

use crate::error::{AppResult, ConfigError};
use crate::models::form::FormConfig;

/// 从 TOML 文件加载出题表单
///
/// 课题缺少 id（或 id 重复）时按顺序补齐为 `topic-N`
pub async fn load_form_config(toml_file_path: &Path) -> AppResult<FormConfig> {
    let path_display = toml_file_path.display().to_string();
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| ConfigError::FormParseFailed {
            path: path_display.clone(),
            reason: format!("无法读取TOML文件: {}", e),
        })?;

    let form = parse_form_config(&content).map_err(|reason| ConfigError::FormParseFailed {
        path: path_display.clone(),
        reason,
    })?;

    tracing::info!(
        "成功加载表单: 科目 {} | 课题 {} 个",
        form.subject,
        form.lesson_topics.len()
    );

    Ok(form)
}

/// 解析表单内容并补齐课题 id
pub fn parse_form_config(content: &str) -> Result<FormConfig, String> {
    let mut form: FormConfig = toml::from_str(content).map_err(|e| e.to_string())?;

    if form.lesson_topics.is_empty() {
        return Err("至少需要一个课题 (lessonTopics)".to_string());
    }

    let mut seen = HashSet::new();
    for (index, topic) in form.lesson_topics.iter_mut().enumerate() {
        let id = topic.id.trim().to_string();
        if id.is_empty() || !seen.insert(id.clone()) {
            let mut n = index + 1;
            while seen.contains(&format!("topic-{}", n)) {
                n += 1;
            }
            topic.id = format!("topic-{}", n);
            seen.insert(topic.id.clone());
        } else {
            topic.id = id;
        }
    }

    Ok(form)
}
