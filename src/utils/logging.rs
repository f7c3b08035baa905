/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::GenerationStep;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则根据 `verbose` 选择 debug 或 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 测试中可能被多次调用，忽略重复初始化
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `document`: 教材路径
/// - `model`: 模型名称
pub fn log_startup(document: &str, model: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 小学试卷生成");
    info!("📄 教材文件: {}", document);
    info!("🤖 使用模型: {}", model);
    info!("{}", "=".repeat(60));
}

/// 记录生成步骤开始
pub fn log_step_start(step: GenerationStep, pages: usize, images: usize) {
    info!("\n{}", "─".repeat(60));
    info!("🧠 开始生成{} (页面 {} 个, 图片 {} 张)", step, pages, images);
}

/// 记录生成步骤完成
///
/// # 参数
/// - `step`: 生成步骤
/// - `summary`: 结果摘要
pub fn log_step_done(step: GenerationStep, summary: &str) {
    info!("✓ {}生成完成: {}", step, summary);
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
