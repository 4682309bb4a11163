//! GitHub API access: feed abstraction, wire types and the reqwest client

mod client;

pub use client::{
    GitHubClient, GitHubFeed, PageOutcome, RawEvent, RemoteRepo, GITHUB_API_URL, PAGE_SIZE,
};
