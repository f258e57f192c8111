pub mod connectors;
pub mod health_checks;
pub mod ingest;

pub use health_checks::*;
pub use ingest::*;
