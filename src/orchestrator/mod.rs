//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责驱动生成步骤和整个运行流程，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `generation_orchestrator` - 生成步骤编排器
//! - 一次只驱动一个步骤（矩阵 / 试卷 / 评分指南）
//! - 校验生成结果
//! - 把失败归到对应步骤，并让会话回退到重试点
//!
//! ### `app` - 应用主流程
//! - 加载表单、打开存储
//! - 解析教材
//! - 依次执行三个生成步骤
//! - 保存并导出
//!
//! ## 层次关系
//!
//! ```text
//! app (一次完整运行)
//!     ↓
//! generation_orchestrator (单个生成步骤)
//!     ↓
//! workflow::AuthoringSession (状态机)
//!     ↓
//! services (能力层：extract / select / llm / store / export)
//!     ↓
//! infrastructure (基础设施：PdfRenderer)
//! ```

pub mod app;
pub mod generation_orchestrator;

pub use app::App;
pub use generation_orchestrator::GenerationOrchestrator;
