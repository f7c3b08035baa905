//! # Exam Authoring
//!
//! 小学试卷生成：从教材 PDF 中选取课题页面，经 LLM 依次生成出题矩阵、试卷和评分指南
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（pdfium 绑定），只暴露能力
//! - `PdfRenderer` - 把 PDF 解码成带坐标的文字片段和位图
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PageExtractor` - 阅读顺序文字 + JPEG 快照
//! - `region_selector` - 按课题页码组装上下文
//! - `LlmService` - 实现 `GenerationBackend` 的生成能力
//! - `SavedTestStore` - 已保存试卷的持久化
//! - `ExportService` - 排版并导出试卷
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 一次出题会话
//! - `SessionState` - 显式状态机
//! - `AuthoringSession` - 状态的唯一修改入口
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/generation_orchestrator` - 驱动单个生成步骤
//! - `orchestrator/app` - 一次完整运行
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ExtractedDocument, FormConfig, GeneratedTest, TestMatrix, TestSolution};
pub use orchestrator::{App, GenerationOrchestrator};
pub use services::{GenerationBackend, LlmService};
pub use workflow::{AuthoringSession, SessionState};
