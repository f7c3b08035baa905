//! 基础设施层：持有稀缺资源（pdfium 绑定），只暴露能力

pub mod pdf_renderer;

pub use pdf_renderer::{ensure_paginated_document, media_type_for_path, PdfRenderer, RawPage};
