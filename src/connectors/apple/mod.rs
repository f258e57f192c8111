//! App Store Connect: ES256 token issuance, per-connector token caching
//! and the paginated REST client.

mod client;
mod jwt;
mod registry;
mod token_cache;
mod types;

pub use client::{AppleApiClient, REVIEWS_SORT_NEWEST_FIRST};
pub use jwt::{AppleClaims, AppleTokenIssuer, Credential, TokenError, TokenIssuer};
pub use registry::AppleClientRegistry;
pub use token_cache::{TokenCache, TokenPhase, DEFAULT_REFRESH_THRESHOLD};
pub use types::{CustomerReview, CustomerReviewAttributes, Page, ReviewSummary};

#[cfg(test)]
pub(crate) use jwt::tests::TEST_PRIVATE_KEY;
