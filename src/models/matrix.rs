use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::topic::LessonTopic;

/// 一个题型分组内三个认知层级的题目数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub recognition: u32,
    pub comprehension: u32,
    pub application: u32,
}

impl LevelCounts {
    pub fn total(&self) -> u32 {
        self.recognition
            .saturating_add(self.comprehension)
            .saturating_add(self.application)
    }

    fn add(&mut self, other: &LevelCounts) {
        self.recognition = self.recognition.saturating_add(other.recognition);
        self.comprehension = self.comprehension.saturating_add(other.comprehension);
        self.application = self.application.saturating_add(other.application);
    }
}

/// 矩阵中的一行，对应一个课题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub topic: String,
    /// 客观题
    pub mcq: LevelCounts,
    /// 主观题
    pub written: LevelCounts,
}

impl MatrixRow {
    pub fn total(&self) -> u32 {
        self.mcq.total().saturating_add(self.written.total())
    }
}

/// 出题矩阵
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestMatrix {
    pub rows: Vec<MatrixRow>,
}

/// 矩阵列合计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixTotals {
    pub mcq: LevelCounts,
    pub written: LevelCounts,
}

impl MatrixTotals {
    pub fn grand_total(&self) -> u32 {
        self.mcq.total().saturating_add(self.written.total())
    }

    /// 某一列占总题数的百分比（四舍五入），总数为 0 时为 0
    pub fn percentage(&self, value: u32) -> u32 {
        let total = self.grand_total();
        if total == 0 {
            return 0;
        }
        ((value as f64 / total as f64) * 100.0).round() as u32
    }
}

impl TestMatrix {
    pub fn new(rows: Vec<MatrixRow>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn totals(&self) -> MatrixTotals {
        let mut totals = MatrixTotals::default();
        for row in &self.rows {
            totals.mcq.add(&row.mcq);
            totals.written.add(&row.written);
        }
        totals
    }

    /// 检查矩阵行与课题名称一一对应（按去首尾空白后的名称比较，不要求顺序）
    ///
    /// 返回不匹配的描述，匹配时为 None
    pub fn topic_mismatch(&self, topics: &[LessonTopic]) -> Option<String> {
        let mut expected: HashMap<&str, i64> = HashMap::new();
        for topic in topics {
            *expected.entry(topic.name.trim()).or_default() += 1;
        }
        for row in &self.rows {
            *expected.entry(row.topic.trim()).or_default() -= 1;
        }

        let mut missing: Vec<&str> = Vec::new();
        let mut unexpected: Vec<&str> = Vec::new();
        for (name, count) in &expected {
            if *count > 0 {
                missing.push(*name);
            } else if *count < 0 {
                unexpected.push(*name);
            }
        }
        if missing.is_empty() && unexpected.is_empty() {
            return None;
        }
        missing.sort_unstable();
        unexpected.sort_unstable();
        Some(format!(
            "缺少课题 {:?}，多出课题 {:?}",
            missing, unexpected
        ))
    }
}
