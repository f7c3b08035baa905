pub mod export_service;
pub mod llm_service;
pub mod page_extractor;
pub mod prompts;
pub mod region_selector;
pub mod saved_test_store;

pub use export_service::{build_exam_document, Block, ExamDocument, ExportService};
pub use llm_service::{GenerationBackend, LlmService};
pub use page_extractor::PageExtractor;
pub use region_selector::{build_context, ContextPayload};
pub use saved_test_store::SavedTestStore;
