use std::collections::HashSet;

use crate::domain::{
    code::ShortCode,
    error::InsertError,
    models::{AboutPage, NewShortenedURL, ShortenedURL, UserId},
};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Set-membership view of issued codes, the only capability the generator needs.
pub trait CodeStore {
    /// Returns the subset of `candidates` that is already issued.
    async fn existing_codes(&self, candidates: &[String]) -> Result<HashSet<String>>;
}

pub trait ShortenedURLRepository: CodeStore {
    /// Persists a record. Both `unique_code` and `long_url` are unique; a
    /// violation is reported as the matching [`InsertError`] variant.
    async fn insert(&self, url: NewShortenedURL) -> Result<ShortenedURL, InsertError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<ShortenedURL>>;

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<ShortenedURL>>;

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortenedURL>>;

    async fn list_all(&self) -> Result<Vec<ShortenedURL>>;

    /// Returns false when no record had that id.
    async fn delete(&self, id: i64) -> Result<bool>;
}

pub trait AboutPageRepository {
    async fn get_about(&self) -> Result<Option<AboutPage>>;

    async fn touch_about(&self, updated_at: DateTime<Utc>, updated_by: UserId) -> Result<bool>;
}

/// Named text blobs, e.g. the about page body.
pub trait ContentStore {
    /// A missing blob reads as `None`.
    async fn read(&self, name: &str) -> Result<Option<String>>;

    async fn write(&self, name: &str, content: &str) -> Result<()>;
}
