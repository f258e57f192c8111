//! External Service Connectors
//!
//! Adapters for the services this app talks to: App Store Connect as the
//! review source, and the processing/notification services downstream.
//!
//! ## Architecture Pattern
//!
//! 1. Define a trait at the seam → allows mocking in tests
//! 2. Implement the HTTP client next to it
//! 3. Inject trait objects into services and routes → they never depend on HTTP details
//!
//! ## Testing
//!
//! ```ignore
//! let downstream = Arc::new(RecordingDownstream::default());
//! let dispatcher = SideEffectDispatcher::spawn(downstream.clone());
//! // run an ingest, then inspect downstream.calls()
//! ```

pub mod apple;
pub mod downstream;
pub mod errors;
pub mod review_feed;

pub use apple::{AppleApiClient, AppleClientRegistry, AppleTokenIssuer, TokenCache, TokenIssuer};
pub use downstream::{DownstreamClient, DownstreamConnector};
pub use errors::ConnectorError;
pub use review_feed::{FeedError, FeedProvider, ReviewFeed};

pub use downstream::init as init_downstream;
