//! 出题表单
//!
//! 只保存教师填写的配置，不保存教材原文或图片

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::models::topic::LessonTopic;

/// 启用的客观题题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqTypes {
    pub multiple_choice: bool,
    pub true_false: bool,
    pub matching: bool,
    pub fill_blank: bool,
}

impl Default for McqTypes {
    fn default() -> Self {
        Self {
            multiple_choice: true,
            true_false: false,
            matching: false,
            fill_blank: false,
        }
    }
}

impl McqTypes {
    /// 启用题型的越南语名称，用于提示词
    pub fn selected_labels(&self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        if self.multiple_choice {
            labels.push("Nhiều lựa chọn (A, B, C, D)");
        }
        if self.true_false {
            labels.push("Đúng - Sai");
        }
        if self.matching {
            labels.push("Ghép đôi");
        }
        if self.fill_blank {
            labels.push("Điền khuyết");
        }
        labels
    }
}

/// 出题表单配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormConfig {
    pub subject: String,
    pub class_name: String,
    /// 客观题分值比例（0-100），主观题比例恒为其补数
    pub mcq_ratio: u32,
    pub mcq_count: u32,
    pub written_count: u32,
    pub recognition_ratio: u32,
    pub comprehension_ratio: u32,
    pub application_ratio: u32,
    /// 考试时长（分钟）
    pub time_limit: u32,
    pub mcq_types: McqTypes,
    pub lesson_topics: Vec<LessonTopic>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            subject: "Toán".to_string(),
            class_name: String::new(),
            mcq_ratio: 70,
            mcq_count: 7,
            written_count: 3,
            recognition_ratio: 30,
            comprehension_ratio: 40,
            application_ratio: 30,
            time_limit: 40,
            mcq_types: McqTypes::default(),
            lesson_topics: vec![LessonTopic::new("topic-1", "", 1, 1)],
        }
    }
}

impl FormConfig {
    /// 主观题分值比例
    pub fn written_ratio(&self) -> u32 {
        100u32.saturating_sub(self.mcq_ratio)
    }

    /// 三个认知层级比例之和
    pub fn cognitive_total(&self) -> u32 {
        self.recognition_ratio
            .saturating_add(self.comprehension_ratio)
            .saturating_add(self.application_ratio)
    }

    /// 生成矩阵前的比例校验
    pub fn validate_ratios(&self) -> Result<(), SessionError> {
        if self.mcq_ratio > 100 {
            return Err(SessionError::InvalidRatio {
                value: self.mcq_ratio,
            });
        }
        let total = self.cognitive_total();
        if total != 100 {
            return Err(SessionError::RatioMismatch { total });
        }
        Ok(())
    }
}
