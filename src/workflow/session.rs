//! 出题会话 - 流程层
//!
//! 核心职责：持有一次出题过程中的全部状态（表单、教材页面、矩阵、试卷、评分指南），
//! 并且是这些状态唯一的修改入口。
//!
//! 每个生成步骤拆成 `begin_* → (外部调用) → complete_* / fail_*` 三段：
//! - `begin_*` 检查前置条件、清掉下游结果、进入 Pending，并返回一个自带全部输入的请求
//! - 调用方拿着请求去调用生成服务（会话本身不做任何 IO）
//! - 结果回来后用 `complete_*` 或 `fail_*` 结束这一步
//!
//! 同一时间只允许一个步骤处于 Pending。

use std::mem;

use tracing::{debug, info};

use crate::error::{AppResult, GenerationStep, SessionError};
use crate::models::exam::GeneratedTest;
use crate::models::form::FormConfig;
use crate::models::matrix::TestMatrix;
use crate::models::page::{ExtractedDocument, ExtractionWarning, PageContent};
use crate::models::saved_test::SavedTest;
use crate::models::solution::TestSolution;
use crate::models::topic::LessonTopic;
use crate::services::region_selector::{build_context, ContextPayload};
use crate::workflow::session_state::SessionState;

/// 矩阵生成请求
#[derive(Debug, Clone)]
pub struct MatrixRequest {
    pub payload: ContextPayload,
    pub form: FormConfig,
}

/// 试卷生成请求（上下文按当前课题重新组装）
#[derive(Debug, Clone)]
pub struct TestRequest {
    pub payload: ContextPayload,
    pub matrix: TestMatrix,
    pub form: FormConfig,
}

/// 评分指南请求（不依赖教材内容）
#[derive(Debug, Clone)]
pub struct SolutionRequest {
    pub test: GeneratedTest,
    pub form: FormConfig,
}

/// 出题会话
///
/// 职责：
/// - 维护表单与课题列表
/// - 持有当前教材的页面内容
/// - 以显式状态机管理三个生成步骤
/// - 记录是否有未保存的修改
#[derive(Debug, Default)]
pub struct AuthoringSession {
    form: FormConfig,
    document: Option<ExtractedDocument>,
    state: SessionState,
    dirty: bool,
}

impl AuthoringSession {
    pub fn new(form: FormConfig) -> Self {
        Self {
            form,
            ..Default::default()
        }
    }

    // ========== 表单与课题 ==========

    pub fn form(&self) -> &FormConfig {
        &self.form
    }

    /// 直接修改表单；比例和课题的合法性在生成前统一校验
    pub fn form_mut(&mut self) -> &mut FormConfig {
        &mut self.form
    }

    /// 新增课题，默认页码 1-1
    pub fn add_topic(&mut self) -> &LessonTopic {
        let id = self.next_topic_id();
        debug!("新增课题 {}", id);
        self.form
            .lesson_topics
            .push(LessonTopic::new(id, String::new(), 1, 1));
        let last = self.form.lesson_topics.len() - 1;
        &self.form.lesson_topics[last]
    }

    /// 删除课题；至少保留一个
    pub fn remove_topic(&mut self, id: &str) -> Result<LessonTopic, SessionError> {
        let position = self.topic_position(id)?;
        if self.form.lesson_topics.len() <= 1 {
            return Err(SessionError::LastTopic);
        }
        Ok(self.form.lesson_topics.remove(position))
    }

    /// 修改课题的名称和页码范围
    ///
    /// 页码范围允许暂时无效（选页时会被忽略），名称不能为空
    pub fn update_topic(
        &mut self,
        id: &str,
        name: impl Into<String>,
        start_page: i64,
        end_page: i64,
    ) -> Result<(), SessionError> {
        let position = self.topic_position(id)?;
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SessionError::InvalidTopic {
                id: id.to_string(),
                reason: "tên bài học không được để trống".to_string(),
            });
        }

        let topic = &mut self.form.lesson_topics[position];
        topic.name = name;
        topic.start_page = start_page;
        topic.end_page = end_page;
        Ok(())
    }

    fn topic_position(&self, id: &str) -> Result<usize, SessionError> {
        self.form
            .lesson_topics
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| SessionError::TopicNotFound { id: id.to_string() })
    }

    fn next_topic_id(&self) -> String {
        let mut n = self.form.lesson_topics.len() + 1;
        loop {
            let candidate = format!("topic-{}", n);
            if !self.form.lesson_topics.iter().any(|t| t.id == candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    // ========== 教材 ==========

    /// 载入新教材，替换之前的页面；返回提取时的软警告
    pub fn load_document(&mut self, document: ExtractedDocument) -> Option<ExtractionWarning> {
        info!(
            "📚 载入教材 {} ({} 页)",
            document.file_name,
            document.page_count()
        );
        let warning = document.warning;
        self.document = Some(document);
        warning
    }

    pub fn clear_document(&mut self) {
        self.document = None;
    }

    pub fn document(&self) -> Option<&ExtractedDocument> {
        self.document.as_ref()
    }

    pub fn pages(&self) -> &[PageContent] {
        self.document
            .as_ref()
            .map(|d| d.pages.as_slice())
            .unwrap_or_default()
    }

    fn context_payload(&self) -> AppResult<ContextPayload> {
        if self.pages().is_empty() {
            return Err(SessionError::NoDocument.into());
        }
        Ok(build_context(&self.form.lesson_topics, self.pages())?)
    }

    // ========== 状态查询 ==========

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn matrix(&self) -> Option<&TestMatrix> {
        self.state.matrix()
    }

    pub fn test(&self) -> Option<&GeneratedTest> {
        self.state.test()
    }

    pub fn solution(&self) -> Option<&TestSolution> {
        self.state.solution()
    }

    pub fn is_matrix_pending(&self) -> bool {
        matches!(self.state, SessionState::MatrixPending)
    }

    pub fn is_test_pending(&self) -> bool {
        matches!(self.state, SessionState::TestPending { .. })
    }

    pub fn is_solution_pending(&self) -> bool {
        matches!(self.state, SessionState::SolutionPending { .. })
    }

    /// 有试卷且尚未保存或导出
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty && self.state.test().is_some()
    }

    fn ensure_nothing_pending(&self) -> Result<(), SessionError> {
        match self.state.pending_step() {
            Some(step) => Err(SessionError::StepInFlight { step }),
            None => Ok(()),
        }
    }

    // ========== 矩阵 ==========

    /// 开始生成矩阵
    ///
    /// 先清空矩阵、试卷和评分指南，再检查比例与选页；
    /// 前置条件不满足时停在 Idle
    pub fn begin_matrix(&mut self) -> AppResult<MatrixRequest> {
        self.ensure_nothing_pending()?;
        self.state = SessionState::Idle;

        self.form.validate_ratios()?;
        let payload = self.context_payload()?;

        self.state = SessionState::MatrixPending;
        Ok(MatrixRequest {
            payload,
            form: self.form.clone(),
        })
    }

    pub fn complete_matrix(&mut self, matrix: TestMatrix) -> Result<(), SessionError> {
        match mem::take(&mut self.state) {
            SessionState::MatrixPending => {
                self.state = SessionState::MatrixReady { matrix };
                Ok(())
            }
            other => self.not_pending(other, GenerationStep::Matrix),
        }
    }

    /// 矩阵生成失败：回到 Idle，所有结果清空
    pub fn fail_matrix(&mut self) -> Result<(), SessionError> {
        match mem::take(&mut self.state) {
            SessionState::MatrixPending => Ok(()),
            other => self.not_pending(other, GenerationStep::Matrix),
        }
    }

    // ========== 试卷 ==========

    /// 开始生成试卷
    ///
    /// 需要已有矩阵；清空试卷和评分指南后按当前课题重新组装上下文
    pub fn begin_test(&mut self) -> AppResult<TestRequest> {
        self.ensure_nothing_pending()?;
        let matrix = self
            .state
            .matrix()
            .cloned()
            .ok_or(SessionError::MatrixRequired)?;

        self.state = SessionState::MatrixReady {
            matrix: matrix.clone(),
        };
        let payload = self.context_payload()?;

        self.state = SessionState::TestPending {
            matrix: matrix.clone(),
        };
        Ok(TestRequest {
            payload,
            matrix,
            form: self.form.clone(),
        })
    }

    pub fn complete_test(&mut self, test: GeneratedTest) -> Result<(), SessionError> {
        match mem::take(&mut self.state) {
            SessionState::TestPending { matrix } => {
                self.state = SessionState::TestReady {
                    matrix: Some(matrix),
                    test,
                };
                self.dirty = true;
                Ok(())
            }
            other => self.not_pending(other, GenerationStep::Test),
        }
    }

    /// 试卷生成失败：保留矩阵
    pub fn fail_test(&mut self) -> Result<(), SessionError> {
        match mem::take(&mut self.state) {
            SessionState::TestPending { matrix } => {
                self.state = SessionState::MatrixReady { matrix };
                Ok(())
            }
            other => self.not_pending(other, GenerationStep::Test),
        }
    }

    // ========== 评分指南 ==========

    /// 开始生成评分指南，需要已有试卷
    pub fn begin_solution(&mut self) -> AppResult<SolutionRequest> {
        self.ensure_nothing_pending()?;
        let (matrix, test) = match mem::take(&mut self.state) {
            SessionState::TestReady { matrix, test }
            | SessionState::SolutionReady { matrix, test, .. } => (matrix, test),
            other => {
                self.state = other;
                return Err(SessionError::TestRequired.into());
            }
        };

        let request = SolutionRequest {
            test: test.clone(),
            form: self.form.clone(),
        };
        self.state = SessionState::SolutionPending { matrix, test };
        Ok(request)
    }

    pub fn complete_solution(&mut self, solution: TestSolution) -> Result<(), SessionError> {
        match mem::take(&mut self.state) {
            SessionState::SolutionPending { matrix, test } => {
                self.state = SessionState::SolutionReady {
                    matrix,
                    test,
                    solution,
                };
                Ok(())
            }
            other => self.not_pending(other, GenerationStep::Solution),
        }
    }

    /// 评分指南生成失败：保留试卷
    pub fn fail_solution(&mut self) -> Result<(), SessionError> {
        match mem::take(&mut self.state) {
            SessionState::SolutionPending { matrix, test } => {
                self.state = SessionState::TestReady { matrix, test };
                Ok(())
            }
            other => self.not_pending(other, GenerationStep::Solution),
        }
    }

    fn not_pending(&mut self, previous: SessionState, step: GenerationStep) -> Result<(), SessionError> {
        self.state = previous;
        Err(SessionError::NotPending { step })
    }

    // ========== 编辑 / 保存 ==========

    /// 就地修改当前试卷；评分指南保留
    pub fn edit_test<F>(&mut self, edit: F) -> Result<(), SessionError>
    where
        F: FnOnce(&mut GeneratedTest),
    {
        self.ensure_nothing_pending()?;
        let test = self.state.test_mut().ok_or(SessionError::TestRequired)?;
        edit(test);
        self.dirty = true;
        Ok(())
    }

    /// 已写入存储
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// 已导出文件
    pub fn mark_exported(&mut self) {
        self.dirty = false;
    }

    /// 从已保存试卷恢复
    ///
    /// 表单和试卷原样恢复；矩阵、评分指南和教材页面都不会恢复
    pub fn restore_saved(&mut self, saved: &SavedTest) -> Result<(), SessionError> {
        self.ensure_nothing_pending()?;
        self.form = saved.form_data.clone();
        self.document = None;
        self.state = SessionState::TestReady {
            matrix: None,
            test: saved.test_data.clone(),
        };
        self.dirty = false;
        info!("📂 已恢复试卷: {}", saved.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, SelectionError};
    use crate::models::exam::{CognitiveLevel, WrittenQuestion};
    use crate::models::matrix::{LevelCounts, MatrixRow};
    use crate::models::solution::WrittenGradingGuide;

    fn document() -> ExtractedDocument {
        ExtractedDocument {
            file_name: "sgk.pdf".into(),
            pages: vec![
                PageContent {
                    text: "Bài 1".into(),
                    image: Some("img".into()),
                },
                PageContent {
                    text: "Bài 2".into(),
                    image: None,
                },
            ],
            warning: None,
        }
    }

    fn form() -> FormConfig {
        FormConfig {
            lesson_topics: vec![LessonTopic::new("topic-1", "Bài 1", 1, 2)],
            ..Default::default()
        }
    }

    fn ready_session() -> AuthoringSession {
        let mut session = AuthoringSession::new(form());
        session.load_document(document());
        session
    }

    fn matrix() -> TestMatrix {
        TestMatrix::new(vec![MatrixRow {
            topic: "Bài 1".into(),
            mcq: LevelCounts {
                recognition: 2,
                comprehension: 3,
                application: 2,
            },
            written: LevelCounts {
                recognition: 1,
                comprehension: 1,
                application: 1,
            },
        }])
    }

    fn test_paper() -> GeneratedTest {
        GeneratedTest {
            written_questions: vec![WrittenQuestion {
                question_text: "Câu hỏi".into(),
                suggested_answer: "Gợi ý".into(),
                cognitive_level: CognitiveLevel::Comprehension,
            }],
            ..Default::default()
        }
    }

    fn solution() -> TestSolution {
        TestSolution {
            written_grading_guides: vec![WrittenGradingGuide {
                question_text: "Câu hỏi".into(),
                detailed_guide: "1 điểm".into(),
            }],
        }
    }

    fn session_with_solution() -> AuthoringSession {
        let mut session = ready_session();
        session.begin_matrix().unwrap();
        session.complete_matrix(matrix()).unwrap();
        session.begin_test().unwrap();
        session.complete_test(test_paper()).unwrap();
        session.begin_solution().unwrap();
        session.complete_solution(solution()).unwrap();
        session
    }

    #[test]
    fn full_happy_path_walks_every_state() {
        let mut session = ready_session();
        assert_eq!(session.state(), &SessionState::Idle);

        let request = session.begin_matrix().unwrap();
        assert!(session.is_matrix_pending());
        assert_eq!(request.payload.page_numbers, vec![1, 2]);
        session.complete_matrix(matrix()).unwrap();
        assert_eq!(session.state().to_string(), "MatrixReady");

        let request = session.begin_test().unwrap();
        assert!(session.is_test_pending());
        assert_eq!(request.matrix, matrix());
        session.complete_test(test_paper()).unwrap();
        assert!(session.has_unsaved_changes());

        let request = session.begin_solution().unwrap();
        assert!(session.is_solution_pending());
        assert_eq!(request.test, test_paper());
        session.complete_solution(solution()).unwrap();
        assert_eq!(session.solution(), Some(&solution()));
        assert_eq!(session.matrix(), Some(&matrix()));
    }

    #[test]
    fn ratio_mismatch_blocks_matrix_and_clears_results() {
        let mut session = session_with_solution();
        session.form_mut().application_ratio = 10;

        let err = session.begin_matrix().unwrap_err();
        assert!(matches!(
            err,
            AppError::Session(SessionError::RatioMismatch { total: 80 })
        ));
        assert_eq!(session.state(), &SessionState::Idle);
        assert!(session.test().is_none());
    }

    #[test]
    fn matrix_requires_a_document_and_valid_pages() {
        let mut session = AuthoringSession::new(form());
        assert!(matches!(
            session.begin_matrix(),
            Err(AppError::Session(SessionError::NoDocument))
        ));

        session.load_document(document());
        session.update_topic("topic-1", "Bài 1", 5, 3).unwrap();
        assert!(matches!(
            session.begin_matrix(),
            Err(AppError::Selection(SelectionError::NoValidPageRange))
        ));
    }

    #[test]
    fn test_generation_without_matrix_is_rejected() {
        let mut session = ready_session();
        assert!(matches!(
            session.begin_test(),
            Err(AppError::Session(SessionError::MatrixRequired))
        ));
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn starting_test_generation_clears_previous_solution() {
        let mut session = session_with_solution();
        session.begin_test().unwrap();
        assert!(session.test().is_none());
        assert!(session.solution().is_none());
        assert_eq!(session.matrix(), Some(&matrix()));
    }

    #[test]
    fn failures_keep_earlier_results() {
        let mut session = ready_session();
        session.begin_matrix().unwrap();
        session.complete_matrix(matrix()).unwrap();

        session.begin_test().unwrap();
        session.fail_test().unwrap();
        assert_eq!(session.state(), &SessionState::MatrixReady { matrix: matrix() });

        session.begin_test().unwrap();
        session.complete_test(test_paper()).unwrap();
        session.begin_solution().unwrap();
        session.fail_solution().unwrap();
        assert_eq!(session.test(), Some(&test_paper()));
        assert!(session.solution().is_none());

        session.begin_matrix().unwrap();
        session.fail_matrix().unwrap();
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn only_one_step_in_flight() {
        let mut session = ready_session();
        session.begin_matrix().unwrap();
        assert!(matches!(
            session.begin_matrix(),
            Err(AppError::Session(SessionError::StepInFlight {
                step: GenerationStep::Matrix
            }))
        ));
        assert!(matches!(
            session.begin_test(),
            Err(AppError::Session(SessionError::StepInFlight { .. }))
        ));
        assert!(session.is_matrix_pending());
    }

    #[test]
    fn results_for_a_step_that_is_not_pending_are_rejected() {
        let mut session = ready_session();
        assert_eq!(
            session.complete_test(test_paper()),
            Err(SessionError::NotPending {
                step: GenerationStep::Test
            })
        );
        assert_eq!(session.state(), &SessionState::Idle);
    }

    #[test]
    fn topic_editing_rules() {
        let mut session = ready_session();
        let new_id = session.add_topic().id.clone();
        assert_eq!(new_id, "topic-2");
        assert_eq!(session.form().lesson_topics[1].start_page, 1);

        assert_eq!(
            session.update_topic(&new_id, "  ", 1, 2),
            Err(SessionError::InvalidTopic {
                id: new_id.clone(),
                reason: "tên bài học không được để trống".into()
            })
        );
        session.update_topic(&new_id, "Bài 2", 2, 2).unwrap();

        session.remove_topic("topic-1").unwrap();
        assert_eq!(session.remove_topic(&new_id), Err(SessionError::LastTopic));
        assert_eq!(
            session.remove_topic("nope"),
            Err(SessionError::TopicNotFound { id: "nope".into() })
        );
    }

    #[test]
    fn edits_mark_unsaved_until_saved_or_exported() {
        let mut session = session_with_solution();
        session.mark_exported();
        assert!(!session.has_unsaved_changes());

        session
            .edit_test(|t| t.written_questions[0].question_text = "Câu mới".into())
            .unwrap();
        assert!(session.has_unsaved_changes());
        assert_eq!(session.test().unwrap().written_questions[0].question_text, "Câu mới");
        assert!(session.solution().is_some());

        session.mark_saved();
        assert!(!session.has_unsaved_changes());
    }

    #[test]
    fn restoring_drops_matrix_solution_and_pages() {
        let mut session = session_with_solution();
        let saved_form = FormConfig {
            subject: "Tiếng Việt".into(),
            ..form()
        };
        let saved = SavedTest::new(&test_paper(), &saved_form);

        session.restore_saved(&saved).unwrap();
        assert_eq!(session.form(), &saved_form);
        assert_eq!(session.test(), Some(&test_paper()));
        assert!(session.matrix().is_none());
        assert!(session.solution().is_none());
        assert!(session.pages().is_empty());
        assert!(!session.has_unsaved_changes());
    }
}
