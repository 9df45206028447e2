//! Document fetchers.
//!
//! Documents, template files and remote scripts are all read through the
//! same [`DocumentFetcher`](trellis_core::application::ports::DocumentFetcher)
//! port. [`CompositeFetcher`] routes a location to the right backend.

mod composite;
mod http;
mod local;
mod memory;

pub use composite::CompositeFetcher;
pub use http::{HttpFetcher, HttpFetcherConfig};
pub use local::LocalFetcher;
pub use memory::InMemoryFetcher;
