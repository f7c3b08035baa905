//! 页面内容模型
//!
//! 一份教材解码后得到的逐页文字和快照，只保存在内存中

/// 页面上带坐标的一段文字
///
/// 坐标使用 PDF 页面坐标系：`y` 越大越靠上
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

/// 单页内容（页码从 1 开始，由在序列中的位置决定）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContent {
    /// 按阅读顺序重建的文字，可能为空
    pub text: String,
    /// base64 编码的 JPEG 快照，渲染失败时为空
    pub image: Option<String>,
}

impl PageContent {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }
}

/// 提取结果的软警告（不阻断流程）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionWarning {
    /// 所有页面既没有文字也没有图片
    NoExtractableContent,
}

/// 已解码的教材
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub file_name: String,
    pub pages: Vec<PageContent>,
    pub warning: Option<ExtractionWarning>,
}

impl ExtractedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
