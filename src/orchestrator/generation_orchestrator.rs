//! 生成步骤编排器 - 编排层
//!
//! ## 职责
//!
//! 把会话的 `begin_* / complete_* / fail_*` 与生成服务的一次调用串起来：
//!
//! 1. 向会话要请求（前置条件在这里失败时不会调用生成服务）
//! 2. 调用生成服务
//! 3. 校验返回结果
//! 4. 成功写回会话；失败让会话回退到重试点，并把错误归到对应步骤
//!
//! 不做自动重试，重试永远是调用方再调一次。

use anyhow::{bail, Result};
use tracing::warn;

use crate::error::{AppError, AppResult, GenerationStep};
use crate::models::exam::GeneratedTest;
use crate::models::form::FormConfig;
use crate::models::matrix::TestMatrix;
use crate::models::solution::TestSolution;
use crate::services::llm_service::GenerationBackend;
use crate::utils::logging::{log_step_done, log_step_start};
use crate::workflow::AuthoringSession;

/// 矩阵必须与课题一一对应
pub fn validate_matrix(matrix: &TestMatrix, form: &FormConfig) -> Result<()> {
    if matrix.is_empty() {
        bail!("矩阵为空");
    }
    if let Some(mismatch) = matrix.topic_mismatch(&form.lesson_topics) {
        bail!("矩阵与课题不一致: {}", mismatch);
    }
    Ok(())
}

/// 试卷至少要有一道题
pub fn validate_test(test: &GeneratedTest) -> Result<()> {
    if test.total_count() == 0 {
        bail!("试卷中没有任何题目");
    }
    Ok(())
}

/// 每道主观题恰好一条评分指南
pub fn validate_solution(solution: &TestSolution, test: &GeneratedTest) -> Result<()> {
    let guides = solution.written_grading_guides.len();
    let written = test.written_count();
    if guides != written {
        bail!("评分指南数量 {} 与主观题数量 {} 不一致", guides, written);
    }
    Ok(())
}

/// 生成步骤编排器
pub struct GenerationOrchestrator<B> {
    backend: B,
}

impl<B: GenerationBackend> GenerationOrchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 生成出题矩阵
    pub async fn generate_matrix(&self, session: &mut AuthoringSession) -> AppResult<()> {
        let request = session.begin_matrix()?;
        log_step_start(
            GenerationStep::Matrix,
            request.payload.page_numbers.len(),
            request.payload.images.len(),
        );

        let result = match self
            .backend
            .generate_matrix(&request.payload, &request.form)
            .await
        {
            Ok(matrix) => validate_matrix(&matrix, &request.form).map(|_| matrix),
            Err(e) => Err(e),
        };

        match result {
            Ok(matrix) => {
                let summary = format!("{} 个课题, 共 {} 题", matrix.rows.len(), matrix.totals().grand_total());
                session.complete_matrix(matrix)?;
                log_step_done(GenerationStep::Matrix, &summary);
                Ok(())
            }
            Err(e) => {
                session.fail_matrix()?;
                Err(step_failed(GenerationStep::Matrix, e))
            }
        }
    }

    /// 生成试卷
    pub async fn generate_test(&self, session: &mut AuthoringSession) -> AppResult<()> {
        let request = session.begin_test()?;
        log_step_start(
            GenerationStep::Test,
            request.payload.page_numbers.len(),
            request.payload.images.len(),
        );

        let result = match self
            .backend
            .generate_test(&request.payload, &request.matrix, &request.form)
            .await
        {
            Ok(test) => validate_test(&test).map(|_| test),
            Err(e) => Err(e),
        };

        match result {
            Ok(test) => {
                let summary = format!(
                    "客观题 {} 道, 主观题 {} 道",
                    test.objective_count(),
                    test.written_count()
                );
                session.complete_test(test)?;
                log_step_done(GenerationStep::Test, &summary);
                Ok(())
            }
            Err(e) => {
                session.fail_test()?;
                Err(step_failed(GenerationStep::Test, e))
            }
        }
    }

    /// 生成评分指南
    pub async fn generate_solution(&self, session: &mut AuthoringSession) -> AppResult<()> {
        let request = session.begin_solution()?;
        log_step_start(GenerationStep::Solution, 0, 0);

        let result = match self
            .backend
            .generate_solution(&request.test, &request.form)
            .await
        {
            Ok(solution) => validate_solution(&solution, &request.test).map(|_| solution),
            Err(e) => Err(e),
        };

        match result {
            Ok(solution) => {
                let summary = format!("{} 条评分指南", solution.written_grading_guides.len());
                session.complete_solution(solution)?;
                log_step_done(GenerationStep::Solution, &summary);
                Ok(())
            }
            Err(e) => {
                session.fail_solution()?;
                Err(step_failed(GenerationStep::Solution, e))
            }
        }
    }
}

fn step_failed(step: GenerationStep, err: anyhow::Error) -> AppError {
    warn!("⚠️ {}生成失败: {:#}", step, err);
    AppError::generation_failed(step, format!("{:#}", err))
}
