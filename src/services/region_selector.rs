//! 选页服务 - 业务能力层
//!
//! 根据课题的页码范围，从已提取的页面中挑出相关页，
//! 拼成一段带页码标签的文字和一组按页码排序的图片。
//! 每次生成前都重新计算，不做缓存。

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::SelectionError;
use crate::models::page::PageContent;
use crate::models::topic::LessonTopic;

/// 上下文开头的固定说明
pub const CONTEXT_PREAMBLE: &str =
    "Bối cảnh: Nội dung sau được trích xuất từ các trang có liên quan trong tài liệu học liệu.\n";

/// 交给生成服务的上下文
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextPayload {
    /// 说明 + 逐页文字块（页码升序）
    pub text: String,
    /// 逐页快照（页码升序，只包含有图片的页）
    pub images: Vec<String>,
    /// 实际纳入的页码（已去掉越界页）
    pub page_numbers: Vec<i64>,
}

/// 所有课题覆盖、且不超过 `page_count` 的页码：去重、升序；无效范围的课题被忽略
pub fn selected_page_numbers(topics: &[LessonTopic], page_count: usize) -> Vec<i64> {
    let last_page = i64::try_from(page_count).unwrap_or(i64::MAX);
    let pages: BTreeSet<i64> = topics
        .iter()
        .flat_map(|topic| topic.pages_within(last_page))
        .collect();
    pages.into_iter().collect()
}

/// 页面块的标签
pub fn page_label(page_number: i64) -> String {
    format!("--- NỘI DUNG TRANG {} ---", page_number)
}

/// 组装上下文
///
/// 越界页码（不在 `[1, pages.len()]` 内）直接跳过，不报错
pub fn select(topics: &[LessonTopic], pages: &[PageContent]) -> ContextPayload {
    let mut payload = ContextPayload {
        text: CONTEXT_PREAMBLE.to_string(),
        ..Default::default()
    };

    for topic in topics.iter().filter(|t| t.end_page > pages.len() as i64) {
        debug!(
            "课题 {} 的页码 {}-{} 超出文档范围 (共 {} 页)，越界部分跳过",
            topic.name,
            topic.start_page,
            topic.end_page,
            pages.len()
        );
    }

    for page_number in selected_page_numbers(topics, pages.len()) {
        let Some(content) = page_at(pages, page_number) else {
            continue;
        };

        payload.text.push('\n');
        payload.text.push_str(&page_label(page_number));
        payload.text.push('\n');
        payload.text.push_str(&content.text);

        if let Some(image) = &content.image {
            payload.images.push(image.clone());
        }
        payload.page_numbers.push(page_number);
    }

    payload
}

/// 带前置校验的选页
///
/// - 没有任何有效页码范围 → `NoValidPageRange`
/// - 所选页面的文字全部为空（或全部越界）→ `NoContentForSelectedPages`
pub fn build_context(
    topics: &[LessonTopic],
    pages: &[PageContent],
) -> Result<ContextPayload, SelectionError> {
    if !topics.iter().any(LessonTopic::has_valid_range) {
        return Err(SelectionError::NoValidPageRange);
    }

    let payload = select(topics, pages);

    let has_text = payload
        .page_numbers
        .iter()
        .filter_map(|&n| page_at(pages, n))
        .any(|page| !page.text.trim().is_empty());
    if !has_text {
        return Err(SelectionError::NoContentForSelectedPages);
    }

    debug!(
        "上下文组装完成: 页码 {:?}, 文字 {} 字符, 图片 {} 张",
        payload.page_numbers,
        payload.text.chars().count(),
        payload.images.len()
    );

    Ok(payload)
}

fn page_at(pages: &[PageContent], page_number: i64) -> Option<&PageContent> {
    if page_number < 1 {
        return None;
    }
    pages.get((page_number - 1) as usize)
}
