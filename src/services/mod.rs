pub mod dispatcher;
pub mod ingestion;

pub use dispatcher::{completion_message, SideEffectDispatcher};
pub use ingestion::{IngestionError, IngestionService, APPLE_REVIEW_SOURCE};
