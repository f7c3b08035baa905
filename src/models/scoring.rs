//! 分值计算与题号
//!
//! 满分固定 10 分。客观题部分 = mcq_ratio / 100 * 10，主观题部分为其补数。
//! 每题分值 = 部分分值 / 该部分题数（题数为 0 时为 0）。
//! 题号在五种题型之间连续编号，顺序固定为：判断、连线、填空、选择、主观题。
//! 屏幕展示和导出文件都必须使用这里的结果。

use crate::models::exam::GeneratedTest;

/// 满分
pub const TOTAL_SCORE: f64 = 10.0;

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    TrueFalse,
    Matching,
    FillBlank,
    MultipleChoice,
    Written,
}

impl QuestionKind {
    /// 编号顺序
    pub const NUMBERING_ORDER: [QuestionKind; 5] = [
        QuestionKind::TrueFalse,
        QuestionKind::Matching,
        QuestionKind::FillBlank,
        QuestionKind::MultipleChoice,
        QuestionKind::Written,
    ];

    pub fn is_objective(self) -> bool {
        !matches!(self, QuestionKind::Written)
    }

    fn count_in(self, test: &GeneratedTest) -> usize {
        match self {
            QuestionKind::TrueFalse => test.true_false_questions.len(),
            QuestionKind::Matching => test.matching_questions.len(),
            QuestionKind::FillBlank => test.fill_blank_questions.len(),
            QuestionKind::MultipleChoice => test.multiple_choice_questions.len(),
            QuestionKind::Written => test.written_questions.len(),
        }
    }
}

/// 分值拆分
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub objective_score: f64,
    pub written_score: f64,
    pub points_per_objective: f64,
    pub points_per_written: f64,
}

impl ScoreBreakdown {
    pub fn new(mcq_ratio: u32, test: &GeneratedTest) -> Self {
        let mcq_ratio = mcq_ratio.min(100);
        let written_ratio = 100 - mcq_ratio;
        let objective_score = mcq_ratio as f64 * TOTAL_SCORE / 100.0;
        let written_score = written_ratio as f64 * TOTAL_SCORE / 100.0;

        Self {
            objective_score,
            written_score,
            points_per_objective: per_question(objective_score, test.objective_count()),
            points_per_written: per_question(written_score, test.written_count()),
        }
    }

    pub fn points_for(&self, kind: QuestionKind) -> f64 {
        if kind.is_objective() {
            self.points_per_objective
        } else {
            self.points_per_written
        }
    }
}

fn per_question(section_score: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        section_score / count as f64
    }
}

/// 带编号的题目引用
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberedQuestion {
    /// 全卷连续题号，从 1 开始
    pub number: usize,
    pub kind: QuestionKind,
    /// 在本题型集合中的下标
    pub index: usize,
    pub points: f64,
}

/// 按固定题型顺序给全卷编号
pub fn number_questions(test: &GeneratedTest, scores: &ScoreBreakdown) -> Vec<NumberedQuestion> {
    let mut numbered = Vec::with_capacity(test.total_count());
    let mut counter = 0;
    for kind in QuestionKind::NUMBERING_ORDER {
        for index in 0..kind.count_in(test) {
            counter += 1;
            numbered.push(NumberedQuestion {
                number: counter,
                kind,
                index,
                points: scores.points_for(kind),
            });
        }
    }
    numbered
}

/// 部分分值：保留一位小数，去掉末尾的 ".0"
pub fn format_score(score: f64) -> String {
    let text = format!("{:.1}", score);
    match text.strip_suffix(".0") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// 每题分值：最多两位小数，去掉末尾的 0
pub fn format_points(points: f64) -> String {
    if points == 0.0 {
        return "0".to_string();
    }
    let text = format!("{:.2}", points);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
