pub mod analysis;
pub mod conversation;
pub mod generation;
pub mod palette;
pub mod prompts;
pub mod request;
pub mod schema;
pub mod session;
pub mod suggestions;

#[cfg(test)]
pub mod testing;

/// The provider credential is missing. Enrichment clients contain every other
/// failure, but this one always reaches the caller.
#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("the generative provider is not configured")]
pub struct NotConfigured;
