//! 试卷模型
//!
//! 五种题型各自一个有序集合，每道题带认知层级标签。
//! 字段名与生成服务返回的 JSON 保持一致（camelCase）。

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

/// 认知层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CognitiveLevel {
    /// 识记
    #[serde(rename = "Nhận biết")]
    Recognition,
    /// 理解
    #[serde(rename = "Thông hiểu")]
    Comprehension,
    /// 运用
    #[serde(rename = "Vận dụng")]
    Application,
}

impl CognitiveLevel {
    /// 展示用的越南语名称（与序列化值相同）
    pub fn label(self) -> &'static str {
        match self {
            CognitiveLevel::Recognition => "Nhận biết",
            CognitiveLevel::Comprehension => "Thông hiểu",
            CognitiveLevel::Application => "Vận dụng",
        }
    }
}

impl std::fmt::Display for CognitiveLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub cognitive_level: CognitiveLevel,
}

impl MultipleChoiceQuestion {
    /// 正确选项的字母（A、B、C…），答案不在选项中时为 None
    pub fn answer_letter(&self) -> Option<char> {
        let index = self
            .options
            .iter()
            .position(|option| option == &self.correct_answer)?;
        option_letter(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrueFalseQuestion {
    pub question_text: String,
    pub correct_answer: bool,
    pub cognitive_level: CognitiveLevel,
}

/// 连线题的一对，正确对应关系按身份（item_a ↔ item_b）保存
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingPair {
    pub item_a: String,
    pub item_b: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingQuestion {
    pub prompt: String,
    pub pairs: Vec<MatchingPair>,
    pub cognitive_level: CognitiveLevel,
}

impl MatchingQuestion {
    /// 右列的展示顺序
    ///
    /// 只用于展示：同一个种子总是得到同一排列，`pairs` 本身不会被修改。
    /// 种子为 None 时保持原顺序。
    pub fn display_column_b(&self, seed: Option<u64>) -> Vec<&str> {
        let mut column: Vec<&str> = self.pairs.iter().map(|p| p.item_b.as_str()).collect();
        if let Some(seed) = seed {
            let mut rng = StdRng::seed_from_u64(seed);
            column.shuffle(&mut rng);
        }
        column
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillBlankQuestion {
    /// 题干中用 `___` 表示空格
    pub question_text: String,
    pub correct_answer: String,
    pub cognitive_level: CognitiveLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenQuestion {
    pub question_text: String,
    pub suggested_answer: String,
    pub cognitive_level: CognitiveLevel,
}

/// 生成的试卷
///
/// 客观题集合缺省为空；主观题集合必须出现
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTest {
    #[serde(default)]
    pub multiple_choice_questions: Vec<MultipleChoiceQuestion>,
    #[serde(default)]
    pub true_false_questions: Vec<TrueFalseQuestion>,
    #[serde(default)]
    pub matching_questions: Vec<MatchingQuestion>,
    #[serde(default)]
    pub fill_blank_questions: Vec<FillBlankQuestion>,
    pub written_questions: Vec<WrittenQuestion>,
}

impl GeneratedTest {
    /// 四种客观题的总数
    pub fn objective_count(&self) -> usize {
        self.true_false_questions.len()
            + self.matching_questions.len()
            + self.fill_blank_questions.len()
            + self.multiple_choice_questions.len()
    }

    pub fn written_count(&self) -> usize {
        self.written_questions.len()
    }

    pub fn total_count(&self) -> usize {
        self.objective_count() + self.written_count()
    }
}

/// 0 → 'A'，1 → 'B' …；超过 26 个返回 None
pub fn option_letter(index: usize) -> Option<char> {
    if index < 26 {
        Some((b'A' + index as u8) as char)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matching() -> MatchingQuestion {
        MatchingQuestion {
            prompt: "Nối".into(),
            pairs: (1..=5)
                .map(|i| MatchingPair {
                    item_a: format!("a{i}"),
                    item_b: format!("b{i}"),
                })
                .collect(),
            cognitive_level: CognitiveLevel::Recognition,
        }
    }

    #[test]
    fn shuffle_is_seeded_and_leaves_pairs_untouched() {
        let question = matching();
        let original = question.pairs.clone();

        let first = question.display_column_b(Some(7));
        let second = question.display_column_b(Some(7));
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec!["b1", "b2", "b3", "b4", "b5"]);
        assert_eq!(question.pairs, original);
        assert_eq!(question.display_column_b(None), vec!["b1", "b2", "b3", "b4", "b5"]);
    }

    #[test]
    fn answer_letter_follows_option_position() {
        let q = MultipleChoiceQuestion {
            question_text: "2 + 2 = ?".into(),
            options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
            correct_answer: "4".into(),
            cognitive_level: CognitiveLevel::Recognition,
        };
        assert_eq!(q.answer_letter(), Some('B'));

        let missing = MultipleChoiceQuestion {
            correct_answer: "7".into(),
            ..q
        };
        assert_eq!(missing.answer_letter(), None);
    }

    #[test]
    fn objective_collections_default_to_empty() {
        let json = r#"{"writtenQuestions":[{"questionText":"Kể tên","suggestedAnswer":"...","cognitiveLevel":"Vận dụng"}]}"#;
        let test: GeneratedTest = serde_json::from_str(json).unwrap();
        assert_eq!(test.objective_count(), 0);
        assert_eq!(test.written_questions[0].cognitive_level, CognitiveLevel::Application);
    }

    #[test]
    fn missing_written_collection_is_rejected() {
        let json = r#"{"multipleChoiceQuestions":[]}"#;
        assert!(serde_json::from_str::<GeneratedTest>(json).is_err());
    }
}
