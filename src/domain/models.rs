use crate::domain::code::ShortCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub type UserId = i64;

pub const DEFAULT_ABOUT_FILE_NAME: &str = "About_en.txt";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ShortenedURL {
    pub id: i64,
    pub long_url: String,
    pub short_url: String,
    pub unique_code: ShortCode,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewShortenedURL {
    pub long_url: String,
    pub short_url: String,
    pub unique_code: ShortCode,
    pub user_id: UserId,
}

/// Metadata row of the single about page; the text itself lives in a content file.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AboutPage {
    pub content_file_name: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_updated_by: Option<UserId>,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct AboutPageView {
    pub content: String,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub last_updated_by: Option<UserId>,
}

#[derive(EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    SuperAdmin,
}

/// Who is performing an operation. Authentication happens elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Actor { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::SuperAdmin)
    }
}
