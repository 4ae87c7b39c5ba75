//! Provider-side plumbing for Convoy.
//!
//! Vendor adapters implement `convoy_core::Provider` outside this workspace;
//! this crate supplies the retry policy and a wrapper that applies it to any
//! provider.

pub mod retry;
pub mod retrying;

pub use retry::RetryPolicy;
pub use retrying::RetryingProvider;
