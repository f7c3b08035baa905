use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::models::exam::GeneratedTest;
use crate::models::form::FormConfig;

/// 已保存的试卷快照
///
/// 只保存表单配置和试卷；矩阵、评分指南和教材内容不保存
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTest {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub test_data: GeneratedTest,
    pub form_data: FormConfig,
}

impl SavedTest {
    /// 以当前时间创建快照，id 为毫秒时间戳
    pub fn new(test: &GeneratedTest, form: &FormConfig) -> Self {
        let now = Utc::now();
        Self::at(now, test, form)
    }

    /// 以指定时间创建快照
    pub fn at(created_at: DateTime<Utc>, test: &GeneratedTest, form: &FormConfig) -> Self {
        let local = created_at.with_timezone(&Local);
        Self {
            id: created_at.timestamp_millis().to_string(),
            name: format!("Đề {} - {}", form.subject, local.format("%H:%M:%S %d/%m/%Y")),
            created_at,
            test_data: test.clone(),
            form_data: form.clone(),
        }
    }
}
