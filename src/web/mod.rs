mod client;

pub use client::{WebClient, WebError, WebPage, WebSearchResult};
