pub mod record_ctx;
pub mod record_extractor;

pub use record_ctx::RecordCtx;
pub use record_extractor::RecordExtractor;
