mod connector;
mod ingestion;
mod product;
mod review;

pub use connector::*;
pub use ingestion::*;
pub use product::*;
pub use review::*;
