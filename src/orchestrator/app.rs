//! 应用主流程 - 编排层
//!
//! 一次运行 = 一本教材 + 一份表单：
//! 解析教材 → 矩阵 → 试卷 → 评分指南 → 保存 → 导出

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::infrastructure::media_type_for_path;
use crate::models::loaders::load_form_config;
use crate::models::matrix::TestMatrix;
use crate::models::page::ExtractionWarning;
use crate::models::saved_test::SavedTest;
use crate::orchestrator::generation_orchestrator::GenerationOrchestrator;
use crate::services::{ExportService, LlmService, PageExtractor, SavedTestStore};
use crate::utils::logging::log_startup;
use crate::workflow::AuthoringSession;

/// 应用主结构
pub struct App {
    config: Config,
    session: AuthoringSession,
    orchestrator: GenerationOrchestrator<LlmService>,
    extractor: PageExtractor,
    store: SavedTestStore,
    exporter: ExportService,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config.document_path, &config.llm_model_name);

        if config.llm_api_key.trim().is_empty() {
            warn!("⚠️ 未设置 LLM_API_KEY，生成请求很可能会失败");
        }

        let form = load_form_config(Path::new(&config.form_file))
            .await
            .with_context(|| format!("无法加载表单 {}", config.form_file))?;

        let store = SavedTestStore::open(&config.saved_tests_file, config.store_quota_bytes).await;
        info!("💾 已保存的试卷: {} 份", store.len());

        Ok(Self {
            session: AuthoringSession::new(form),
            orchestrator: GenerationOrchestrator::new(LlmService::new(&config)),
            extractor: PageExtractor::new(&config),
            exporter: ExportService::new(&config.output_dir, config.matching_shuffle_seed),
            store,
            config,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&mut self) -> Result<()> {
        self.load_document().await?;

        self.orchestrator
            .generate_matrix(&mut self.session)
            .await
            .context("出题矩阵生成失败")?;
        if let Some(matrix) = self.session.matrix() {
            log_matrix(matrix);
        }

        self.orchestrator
            .generate_test(&mut self.session)
            .await
            .context("试卷生成失败")?;

        // 评分指南失败时仍然保存和导出试卷本身
        if let Err(e) = self.orchestrator.generate_solution(&mut self.session).await {
            warn!("⚠️ {}，将只导出试卷", e);
        }

        self.save_test().await;
        self.export().await?;

        if self.session.has_unsaved_changes() {
            warn!("⚠️ 试卷尚未保存或导出");
        }

        info!("{}", "=".repeat(60));
        info!("🎉 全部完成");
        info!("{}", "=".repeat(60));
        Ok(())
    }

    /// 读取并解析教材
    async fn load_document(&mut self) -> Result<()> {
        let path = Path::new(&self.config.document_path);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("无法读取教材文件 {}", path.display()))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.config.document_path.clone());
        let media_type = media_type_for_path(path);

        let document = self.extractor.extract(&file_name, media_type, bytes).await?;
        if let Some(ExtractionWarning::NoExtractableContent) = self.session.load_document(document) {
            warn!("⚠️ 教材中没有找到任何文字或图片，生成结果可能为空");
        }
        Ok(())
    }

    /// 保存到存储；失败只记录，不影响导出
    async fn save_test(&mut self) {
        let Some(test) = self.session.test() else {
            return;
        };
        let saved = SavedTest::new(test, self.session.form());

        match self.store.add(saved).await {
            Ok(()) => self.session.mark_saved(),
            Err(e) if e.is_quota_exceeded() => {
                warn!("⚠️ {}", e);
                if let Some(oldest) = self.store.list().last() {
                    warn!("   可删除最早的试卷: {} ({})", oldest.name, oldest.id);
                }
            }
            Err(e) => error!("保存试卷失败: {}", e),
        }
    }

    /// 导出试卷；有评分指南时另外导出带答案的版本
    async fn export(&mut self) -> Result<()> {
        let Some(test) = self.session.test() else {
            return Ok(());
        };

        self.exporter.export(test, None, self.session.form()).await?;
        if let Some(solution) = self.session.solution() {
            self.exporter
                .export(test, Some(solution), self.session.form())
                .await?;
        }

        self.session.mark_exported();
        Ok(())
    }
}

/// 输出矩阵及合计
fn log_matrix(matrix: &TestMatrix) {
    info!("📊 出题矩阵:");
    for row in &matrix.rows {
        info!(
            "   {} | 客观题 {}/{}/{} | 主观题 {}/{}/{}",
            row.topic,
            row.mcq.recognition,
            row.mcq.comprehension,
            row.mcq.application,
            row.written.recognition,
            row.written.comprehension,
            row.written.application
        );
    }

    let totals = matrix.totals();
    let recognition = totals.mcq.recognition + totals.written.recognition;
    let comprehension = totals.mcq.comprehension + totals.written.comprehension;
    let application = totals.mcq.application + totals.written.application;
    info!(
        "   合计 {} 题 | Nhận biết {}% | Thông hiểu {}% | Vận dụng {}%",
        totals.grand_total(),
        totals.percentage(recognition),
        totals.percentage(comprehension),
        totals.percentage(application)
    );
}
