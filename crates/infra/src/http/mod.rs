//! HTTP plumbing: the retrying client and the transport port built on it

pub mod client;
pub mod transport;

pub use client::{HttpClient, HttpClientBuilder};
pub use transport::HttpTransport;
