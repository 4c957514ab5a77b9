use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use crate::domain::{
    code::ShortCode,
    error::InsertError,
    models::{AboutPage, DEFAULT_ABOUT_FILE_NAME, NewShortenedURL, ShortenedURL, UserId},
    repository::{AboutPageRepository, CodeStore, ContentStore, ShortenedURLRepository},
};
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};

struct State {
    urls: BTreeMap<i64, ShortenedURL>,
    next_id: i64,
    about: Option<AboutPage>,
    contents: HashMap<String, String>,
}

/// Process-local store with the same unique constraints as the Postgres one.
pub struct DB {
    state: Mutex<State>,
}

impl Default for DB {
    fn default() -> Self {
        Self::new()
    }
}

impl DB {
    pub fn new() -> Self {
        DB {
            state: Mutex::new(State {
                urls: BTreeMap::new(),
                next_id: 1,
                about: Some(AboutPage {
                    content_file_name: DEFAULT_ABOUT_FILE_NAME.to_string(),
                    last_updated: None,
                    last_updated_by: None,
                }),
                contents: HashMap::new(),
            }),
        }
    }

    /// Drops the about-page row, as if it had never been seeded.
    pub fn without_about(self) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.about = None;
        }
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

impl CodeStore for DB {
    async fn existing_codes(&self, candidates: &[String]) -> Result<HashSet<String>> {
        let state = self.lock()?;
        let wanted: HashSet<&str> = candidates.iter().map(String::as_str).collect();

        Ok(state
            .urls
            .values()
            .map(|u| u.unique_code.as_str())
            .filter(|c| wanted.contains(c))
            .map(String::from)
            .collect())
    }
}

impl ShortenedURLRepository for DB {
    async fn insert(&self, url: NewShortenedURL) -> Result<ShortenedURL, InsertError> {
        let mut state = self.lock()?;

        if state.urls.values().any(|u| u.unique_code == url.unique_code) {
            return Err(InsertError::CodeTaken);
        }
        if state.urls.values().any(|u| u.long_url == url.long_url) {
            return Err(InsertError::LongUrlTaken);
        }

        let id = state.next_id;
        state.next_id += 1;
        let stored = ShortenedURL {
            id,
            long_url: url.long_url,
            short_url: url.short_url,
            unique_code: url.unique_code,
            user_id: url.user_id,
            created_at: Utc::now(),
        };
        state.urls.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ShortenedURL>> {
        Ok(self.lock()?.urls.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<ShortenedURL>> {
        Ok(self
            .lock()?
            .urls
            .values()
            .find(|u| &u.unique_code == code)
            .cloned())
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortenedURL>> {
        Ok(self
            .lock()?
            .urls
            .values()
            .find(|u| u.long_url == long_url)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<ShortenedURL>> {
        Ok(self.lock()?.urls.values().cloned().collect())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.lock()?.urls.remove(&id).is_some())
    }
}

impl AboutPageRepository for DB {
    async fn get_about(&self) -> Result<Option<AboutPage>> {
        Ok(self.lock()?.about.clone())
    }

    async fn touch_about(&self, updated_at: DateTime<Utc>, updated_by: UserId) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(about) = state.about.as_mut() else {
            return Ok(false);
        };
        about.last_updated = Some(updated_at);
        about.last_updated_by = Some(updated_by);
        Ok(true)
    }
}

impl ContentStore for DB {
    async fn read(&self, name: &str) -> Result<Option<String>> {
        Ok(self.lock()?.contents.get(name).cloned())
    }

    async fn write(&self, name: &str, content: &str) -> Result<()> {
        self.lock()?
            .contents
            .insert(name.to_string(), content.to_string());
        Ok(())
    }
}
