//! PDF 渲染器 - 基础设施层
//!
//! 持有唯一的 pdfium 绑定，只暴露"把一份 PDF 解码成原始页面"的能力。
//! pdfium 不是 async 安全的，调用方应在 `spawn_blocking` 中使用。

use image::DynamicImage;
use pdfium_render::prelude::*;
use phf::{phf_map, phf_set};
use tracing::{debug, warn};

use crate::error::{AppResult, DocumentError};
use crate::models::page::TextFragment;

/// 快照渲染比例（PDF 点 → 像素），固定不可配置
pub const RENDER_SCALE: f32 = 1.0;

/// 接受的分页文档媒体类型
static PDF_MEDIA_TYPES: phf::Set<&'static str> = phf_set! {
    "application/pdf",
    "application/x-pdf",
};

/// 扩展名 → 媒体类型
static MEDIA_TYPES_BY_EXTENSION: phf::Map<&'static str, &'static str> = phf_map! {
    "pdf" => "application/pdf",
    "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "doc" => "application/msword",
    "txt" => "text/plain",
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
};

/// 在尝试解码前按声明的媒体类型校验
pub fn ensure_paginated_document(media_type: &str) -> Result<(), DocumentError> {
    let normalized = media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if PDF_MEDIA_TYPES.contains(normalized.as_str()) {
        Ok(())
    } else {
        Err(DocumentError::UnsupportedMediaType {
            media_type: media_type.to_string(),
        })
    }
}

/// 根据文件扩展名推断媒体类型，未知扩展名返回 `application/octet-stream`
pub fn media_type_for_path(path: &std::path::Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .and_then(|ext| MEDIA_TYPES_BY_EXTENSION.get(ext.as_str()).copied())
        .unwrap_or("application/octet-stream")
}

/// 解码后的原始页面
#[derive(Debug)]
pub struct RawPage {
    /// 无序的带坐标文字片段
    pub fragments: Vec<TextFragment>,
    /// 渲染结果；单页失败只记录原因，不影响其他页
    pub snapshot: Result<DynamicImage, String>,
}

/// PDF 渲染器
///
/// 职责：
/// - 持有 pdfium 绑定
/// - 把字节流解码成逐页的文字片段和位图
/// - 不认识课题 / 试卷
pub struct PdfRenderer {
    pdfium: Pdfium,
}

impl PdfRenderer {
    /// 绑定 pdfium 动态库
    ///
    /// 指定目录时先尝试该目录，失败再回退到系统库
    pub fn bind(library_dir: Option<&str>) -> AppResult<Self> {
        let bindings = match library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                .or_else(|_| Pdfium::bind_to_system_library()),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| DocumentError::RendererUnavailable {
            reason: e.to_string(),
        })?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// 解码整份文档
    ///
    /// 文档无法解析时整体失败；单页文字或渲染失败只影响该页
    pub fn decode(&self, bytes: &[u8]) -> AppResult<Vec<RawPage>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| DocumentError::Unreadable {
                reason: e.to_string(),
            })?;

        let page_count = document.pages().len() as usize;
        debug!("PDF 共 {} 页", page_count);

        let mut pages = Vec::with_capacity(page_count);
        for (index, page) in document.pages().iter().enumerate() {
            let page_number = index + 1;

            let fragments = match Self::page_fragments(&page) {
                Ok(fragments) => fragments,
                Err(e) => {
                    warn!("第 {} 页文字提取失败，按空白页处理: {}", page_number, e);
                    Vec::new()
                }
            };

            let snapshot = Self::render_snapshot(&page).map_err(|e| {
                warn!("第 {} 页渲染失败: {}", page_number, e);
                e.to_string()
            });

            pages.push(RawPage {
                fragments,
                snapshot,
            });
        }

        Ok(pages)
    }

    /// 读取页面上的文字片段（x 取左边界，y 取基线）
    fn page_fragments(page: &PdfPage) -> Result<Vec<TextFragment>, PdfiumError> {
        let text = page.text()?;
        let fragments = text
            .segments()
            .iter()
            .filter_map(|segment| {
                let content = segment.text();
                if content.is_empty() {
                    return None;
                }
                let bounds = segment.bounds();
                // 同一行上带下伸部 (g, p, y) 的片段下边界更低，按基线分行
                let y = Self::baseline_y(&segment).unwrap_or(bounds.bottom().value);
                Some(TextFragment::new(content, bounds.left().value, y))
            })
            .collect();
        Ok(fragments)
    }

    /// 片段首字符的基线 y 坐标
    fn baseline_y(segment: &PdfPageTextSegment) -> Option<f32> {
        let chars = segment.chars().ok()?;
        let first = chars.iter().next()?;
        let y = first.origin_y().ok()?.value;
        Some(y)
    }

    /// 按固定比例渲染页面
    fn render_snapshot(page: &PdfPage) -> Result<DynamicImage, PdfiumError> {
        let width = (page.width().value * RENDER_SCALE) as i32;
        let height = (page.height().value * RENDER_SCALE) as i32;

        let bitmap = page.render_with_config(
            &PdfRenderConfig::new()
                .set_target_width(width)
                .set_target_height(height),
        )?;

        Ok(bitmap.as_image())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn only_pdf_media_types_are_accepted() {
        assert!(ensure_paginated_document("application/pdf").is_ok());
        assert!(ensure_paginated_document("Application/PDF; charset=binary").is_ok());
        assert!(ensure_paginated_document("application/x-pdf").is_ok());
        assert!(matches!(
            ensure_paginated_document("image/png"),
            Err(DocumentError::UnsupportedMediaType { .. })
        ));
    }

    #[test]
    fn media_type_from_extension() {
        assert_eq!(media_type_for_path(Path::new("sgk/Toan5.PDF")), "application/pdf");
        assert_eq!(media_type_for_path(Path::new("notes.txt")), "text/plain");
        assert_eq!(media_type_for_path(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    #[ignore] // 需要本机安装 pdfium：cargo test -- --ignored
    fn garbage_bytes_are_unreadable() {
        let renderer = PdfRenderer::bind(None).expect("绑定 pdfium 失败");
        let result = renderer.decode(b"not a pdf");
        assert!(matches!(
            result,
            Err(crate::error::AppError::Document(DocumentError::Unreadable { .. }))
        ));
    }

    #[test]
    #[ignore] // 需要本机安装 pdfium：cargo test -- --ignored
    fn descenders_do_not_split_a_line() {
        let renderer = PdfRenderer::bind(None).expect("绑定 pdfium 失败");
        let bytes = {
            let mut document = renderer.pdfium.create_new_pdf().unwrap();
            let font = document.fonts_mut().helvetica();
            let mut page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::a4())
                .unwrap();
            page.objects_mut()
                .create_text_object(PdfPoints::new(100.0), PdfPoints::new(700.0), "ga", font, PdfPoints::new(14.0))
                .unwrap();
            page.objects_mut()
                .create_text_object(PdfPoints::new(300.0), PdfPoints::new(700.0), "ab", font, PdfPoints::new(14.0))
                .unwrap();
            document.save_to_bytes().unwrap()
        };

        let pages = renderer.decode(&bytes).unwrap();
        let fragments = &pages[0].fragments;
        assert!(!fragments.is_empty());
        assert!(fragments.iter().all(|f| (f.y - fragments[0].y).abs() < 0.5));

        let text = crate::services::page_extractor::reconstruct_text(fragments);
        assert!(!text.contains('\n'), "同一基线的文字被拆成多行: {text:?}");
    }
}
