pub mod archive;
pub mod llm_client;
pub mod normalizer;
pub mod page_layout;
pub mod pdf_processor;
pub mod prompt;
pub mod session_store;
pub mod summarizer;
pub mod table_extractor;

pub use archive::DocumentArchive;
pub use llm_client::LlmClient;
pub use normalizer::{normalize, RawReply, FALLBACK_ANSWER};
pub use pdf_processor::{ExtractionResult, PdfProcessor};
pub use session_store::SessionStore;
pub use summarizer::Summarizer;
pub use table_extractor::TableExtractor;
