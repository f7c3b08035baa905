pub mod exam;
pub mod form;
pub mod loaders;
pub mod matrix;
pub mod page;
pub mod saved_test;
pub mod scoring;
pub mod solution;
pub mod topic;

pub use exam::{
    CognitiveLevel, FillBlankQuestion, GeneratedTest, MatchingPair, MatchingQuestion,
    MultipleChoiceQuestion, TrueFalseQuestion, WrittenQuestion,
};
pub use form::{FormConfig, McqTypes};
pub use loaders::load_form_config;
pub use matrix::{LevelCounts, MatrixRow, MatrixTotals, TestMatrix};
pub use page::{ExtractedDocument, ExtractionWarning, PageContent, TextFragment};
pub use saved_test::SavedTest;
pub use scoring::{NumberedQuestion, QuestionKind, ScoreBreakdown};
pub use solution::{TestSolution, WrittenGradingGuide};
pub use topic::LessonTopic;
