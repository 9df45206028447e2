//! Template rendering adapters.

mod simple;

pub use simple::SimpleRenderer;
