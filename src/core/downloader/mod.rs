pub mod cache;
pub mod client;
pub mod fetch;
pub mod validator;

pub use cache::CacheEntry;
pub use client::HttpFetcher;
pub use fetch::{Fetch, FetchRequest};
pub use validator::{ParsingValidator, Validator};
