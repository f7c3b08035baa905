//! 页面提取服务 - 业务能力层
//!
//! 把一份分页文档转换成逐页的阅读顺序文字和 JPEG 快照。
//! 输出顺序始终与页码一致（1..N）。

use std::cmp::Ordering;
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{ensure_paginated_document, PdfRenderer, RawPage};
use crate::models::page::{ExtractedDocument, ExtractionWarning, PageContent, TextFragment};

/// 快照 JPEG 质量，固定不可配置
pub const JPEG_QUALITY: u8 = 80;

/// 按阅读顺序重建页面文字
///
/// 片段先按 y 降序（上方优先），同一 y 再按 x 升序排列；
/// y 变化时换行，同一 y 的相邻片段之间插入一个空格。
/// 排序只依赖片段本身，因此输出与输入顺序无关。
pub fn reconstruct_text(fragments: &[TextFragment]) -> String {
    let mut sorted: Vec<&TextFragment> = fragments.iter().collect();
    sorted.sort_by(|a, b| reading_order(a, b));

    let mut text = String::new();
    let mut last_y: Option<f32> = None;
    for fragment in sorted {
        match last_y {
            Some(y) if y == fragment.y => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        text.push_str(&fragment.text);
        last_y = Some(fragment.y);
    }
    text
}

fn reading_order(a: &TextFragment, b: &TextFragment) -> Ordering {
    b.y.total_cmp(&a.y)
        .then_with(|| a.x.total_cmp(&b.x))
        // 坐标完全相同时按内容排，保证结果唯一
        .then_with(|| a.text.cmp(&b.text))
}

/// 把快照编码为 base64 JPEG
pub fn encode_snapshot(image: &DynamicImage) -> Result<String, image::ImageError> {
    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), JPEG_QUALITY);
    encoder.encode_image(&image.to_rgb8())?;
    Ok(STANDARD.encode(&bytes))
}

/// 由原始页面组装提取结果
///
/// 单页渲染或编码失败时该页没有图片，其余页面照常处理
pub fn build_document(file_name: &str, raw_pages: Vec<RawPage>) -> ExtractedDocument {
    let pages: Vec<PageContent> = raw_pages
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let text = reconstruct_text(&raw.fragments);
            let image = match raw.snapshot {
                Ok(snapshot) => match encode_snapshot(&snapshot) {
                    Ok(encoded) => Some(encoded),
                    Err(e) => {
                        warn!("第 {} 页快照编码失败: {}", index + 1, e);
                        None
                    }
                },
                Err(reason) => {
                    debug!("第 {} 页没有快照: {}", index + 1, reason);
                    None
                }
            };
            PageContent { text, image }
        })
        .collect();

    let warning = if pages.iter().all(PageContent::is_blank) {
        warn!("⚠️ 文档 {} 中没有找到任何文字或图片", file_name);
        Some(ExtractionWarning::NoExtractableContent)
    } else {
        None
    };

    ExtractedDocument {
        file_name: file_name.to_string(),
        pages,
        warning,
    }
}

/// 页面提取服务
///
/// 职责：
/// - 校验媒体类型
/// - 在阻塞线程中调用 pdfium 解码
/// - 组装 `ExtractedDocument`
pub struct PageExtractor {
    library_dir: Option<String>,
}

impl PageExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            library_dir: config.pdfium_library_dir.clone(),
        }
    }

    /// 提取一份上传的文档
    ///
    /// # 参数
    /// - `file_name`: 文件名（仅用于展示）
    /// - `media_type`: 声明的媒体类型
    /// - `bytes`: 文件内容
    pub async fn extract(
        &self,
        file_name: &str,
        media_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<ExtractedDocument> {
        ensure_paginated_document(media_type)?;

        info!("📖 正在解析文档: {} ({} 字节)", file_name, bytes.len());

        let library_dir = self.library_dir.clone();
        let raw_pages = tokio::task::spawn_blocking(move || {
            let renderer = PdfRenderer::bind(library_dir.as_deref())?;
            renderer.decode(&bytes)
        })
        .await
        .map_err(|e| AppError::document_unreadable(format!("解析任务异常退出: {}", e)))??;

        let document = build_document(file_name, raw_pages);
        info!(
            "✓ 文档解析完成: {} 页, {} 页有快照",
            document.page_count(),
            document.pages.iter().filter(|p| p.image.is_some()).count()
        );

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn frag(text: &str, x: f32, y: f32) -> TextFragment {
        TextFragment::new(text, x, y)
    }

    #[test]
    fn fragments_are_read_top_to_bottom_left_to_right() {
        let fragments = vec![
            frag("world", 120.0, 700.0),
            frag("Line two", 50.0, 680.0),
            frag("Hello", 50.0, 700.0),
        ];
        assert_eq!(reconstruct_text(&fragments), "Hello world\nLine two");
    }

    #[test]
    fn output_does_not_depend_on_input_order() {
        let mut fragments = vec![
            frag("c", 10.0, 500.0),
            frag("a", 10.0, 600.0),
            frag("b", 40.0, 600.0),
            frag("d", 30.0, 500.0),
            frag("e", 0.0, 100.0),
        ];
        let expected = reconstruct_text(&fragments);
        assert_eq!(expected, "a b\nc d\ne");

        fragments.reverse();
        assert_eq!(reconstruct_text(&fragments), expected);
        fragments.swap(0, 3);
        fragments.swap(1, 4);
        assert_eq!(reconstruct_text(&fragments), expected);
    }

    #[test]
    fn identical_positions_are_still_deterministic() {
        let a = vec![frag("y", 5.0, 5.0), frag("x", 5.0, 5.0)];
        let b = vec![frag("x", 5.0, 5.0), frag("y", 5.0, 5.0)];
        assert_eq!(reconstruct_text(&a), reconstruct_text(&b));
    }

    #[test]
    fn empty_page_yields_empty_text() {
        assert_eq!(reconstruct_text(&[]), "");
    }

    fn snapshot() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
    }

    #[test]
    fn render_failure_only_drops_that_page_image() {
        let raw = vec![
            RawPage {
                fragments: vec![frag("Trang 1", 0.0, 10.0)],
                snapshot: Ok(snapshot()),
            },
            RawPage {
                fragments: vec![frag("Trang 2", 0.0, 10.0)],
                snapshot: Err("bitmap allocation failed".to_string()),
            },
        ];
        let document = build_document("sgk.pdf", raw);
        assert_eq!(document.page_count(), 2);
        assert!(document.pages[0].image.is_some());
        assert!(document.pages[1].image.is_none());
        assert_eq!(document.pages[1].text, "Trang 2");
        assert_eq!(document.warning, None);
    }

    #[test]
    fn blank_document_is_flagged_but_not_an_error() {
        let raw = vec![
            RawPage {
                fragments: vec![frag("   ", 0.0, 0.0)],
                snapshot: Err("x".into()),
            },
            RawPage {
                fragments: Vec::new(),
                snapshot: Err("y".into()),
            },
        ];
        let document = build_document("blank.pdf", raw);
        assert_eq!(document.page_count(), 2);
        assert_eq!(document.warning, Some(ExtractionWarning::NoExtractableContent));

        let empty = build_document("empty.pdf", Vec::new());
        assert_eq!(empty.warning, Some(ExtractionWarning::NoExtractableContent));
    }

    #[test]
    fn snapshot_is_base64_jpeg() {
        let encoded = encode_snapshot(&snapshot()).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        // JPEG SOI 标记
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn non_pdf_is_rejected_before_decoding() {
        let extractor = PageExtractor::new(&Config::default());
        let result = extractor
            .extract("notes.docx", "application/msword", b"whatever".to_vec())
            .await;
        assert!(matches!(
            result,
            Err(AppError::Document(crate::error::DocumentError::UnsupportedMediaType { .. }))
        ));
    }
}
