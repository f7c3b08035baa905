use serde::{Deserialize, Serialize};

/// 一道主观题的评分指南
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenGradingGuide {
    pub question_text: String,
    /// 详细评分步骤及各要点分值，多行
    pub detailed_guide: String,
}

/// 评分指南，每道主观题一条，顺序与试卷一致
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSolution {
    pub written_grading_guides: Vec<WrittenGradingGuide>,
}
