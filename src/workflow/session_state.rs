//! 出题会话状态
//!
//! 用一个带数据的枚举表示"当前走到哪一步"，每个状态只携带该状态下
//! 有效的结果，不会出现"有试卷但没有矩阵却在生成评分指南"之类的组合
//! 以外的非法状态。
//!
//! ```text
//! Idle → MatrixPending → MatrixReady → TestPending → TestReady → SolutionPending → SolutionReady
//! ```
//!
//! 从已保存试卷恢复时没有矩阵，因此 `TestReady` 之后的状态中矩阵是可选的。

use std::fmt;

use crate::error::GenerationStep;
use crate::models::exam::GeneratedTest;
use crate::models::matrix::TestMatrix;
use crate::models::solution::TestSolution;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    MatrixPending,
    MatrixReady {
        matrix: TestMatrix,
    },
    TestPending {
        matrix: TestMatrix,
    },
    TestReady {
        matrix: Option<TestMatrix>,
        test: GeneratedTest,
    },
    SolutionPending {
        matrix: Option<TestMatrix>,
        test: GeneratedTest,
    },
    SolutionReady {
        matrix: Option<TestMatrix>,
        test: GeneratedTest,
        solution: TestSolution,
    },
}

impl SessionState {
    /// 正在进行中的步骤
    pub fn pending_step(&self) -> Option<GenerationStep> {
        match self {
            SessionState::MatrixPending => Some(GenerationStep::Matrix),
            SessionState::TestPending { .. } => Some(GenerationStep::Test),
            SessionState::SolutionPending { .. } => Some(GenerationStep::Solution),
            _ => None,
        }
    }

    pub fn matrix(&self) -> Option<&TestMatrix> {
        match self {
            SessionState::Idle | SessionState::MatrixPending => None,
            SessionState::MatrixReady { matrix } | SessionState::TestPending { matrix } => {
                Some(matrix)
            }
            SessionState::TestReady { matrix, .. }
            | SessionState::SolutionPending { matrix, .. }
            | SessionState::SolutionReady { matrix, .. } => matrix.as_ref(),
        }
    }

    pub fn test(&self) -> Option<&GeneratedTest> {
        match self {
            SessionState::TestReady { test, .. }
            | SessionState::SolutionPending { test, .. }
            | SessionState::SolutionReady { test, .. } => Some(test),
            _ => None,
        }
    }

    pub(crate) fn test_mut(&mut self) -> Option<&mut GeneratedTest> {
        match self {
            SessionState::TestReady { test, .. }
            | SessionState::SolutionPending { test, .. }
            | SessionState::SolutionReady { test, .. } => Some(test),
            _ => None,
        }
    }

    pub fn solution(&self) -> Option<&TestSolution> {
        match self {
            SessionState::SolutionReady { solution, .. } => Some(solution),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "Idle",
            SessionState::MatrixPending => "MatrixPending",
            SessionState::MatrixReady { .. } => "MatrixReady",
            SessionState::TestPending { .. } => "TestPending",
            SessionState::TestReady { .. } => "TestReady",
            SessionState::SolutionPending { .. } => "SolutionPending",
            SessionState::SolutionReady { .. } => "SolutionReady",
        };
        write!(f, "{}", name)
    }
}
