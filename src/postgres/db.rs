use std::{collections::HashSet, time::Duration};

use crate::{
    domain::{
        code::ShortCode,
        error::InsertError,
        models::{AboutPage, DEFAULT_ABOUT_FILE_NAME, NewShortenedURL, ShortenedURL, UserId},
        repository::{AboutPageRepository, CodeStore, ShortenedURLRepository},
    },
    postgres::config::Config,
};
use anyhow::{Context, Result};
use backon::{ExponentialBuilder, Retryable};
use chrono::{DateTime, Utc};
use const_format::formatcp;
use sqlx::{FromRow, PgPool, postgres::PgPoolOptions};

const SHORT_URL_TABLE_NAME: &str = "shortened_urls";
const UNIQUE_CODE_CONSTRAINT: &str = "shortened_urls_unique_code_key";
const LONG_URL_CONSTRAINT: &str = "shortened_urls_long_url_key";
const CREATE_SHORT_URL_TABLE_QUERY: &str = formatcp!(
    r#"
    CREATE TABLE IF NOT EXISTS {SHORT_URL_TABLE_NAME} (
        id bigserial PRIMARY KEY,
        long_url varchar(2048) NOT NULL,
        short_url text NOT NULL,
        unique_code varchar(10) NOT NULL,
        user_id bigint NOT NULL,
        created_at timestamptz NOT NULL DEFAULT now(),
        CONSTRAINT {UNIQUE_CODE_CONSTRAINT} UNIQUE (unique_code),
        CONSTRAINT {LONG_URL_CONSTRAINT} UNIQUE (long_url)
    )
"#,
);
const URL_COLUMNS: &str = "id, long_url, short_url, unique_code, user_id, created_at";
const INSERT_URL_QUERY: &str = formatcp!(
    r#"
    INSERT INTO {SHORT_URL_TABLE_NAME} (long_url, short_url, unique_code, user_id)
    VALUES ($1, $2, $3, $4)
    RETURNING {URL_COLUMNS}
"#,
);
const EXISTING_CODES_QUERY: &str = formatcp!(
    "SELECT unique_code FROM {SHORT_URL_TABLE_NAME} WHERE unique_code = ANY($1)"
);
const FIND_BY_ID_QUERY: &str =
    formatcp!("SELECT {URL_COLUMNS} FROM {SHORT_URL_TABLE_NAME} WHERE id = $1");
const FIND_BY_CODE_QUERY: &str =
    formatcp!("SELECT {URL_COLUMNS} FROM {SHORT_URL_TABLE_NAME} WHERE unique_code = $1");
const FIND_BY_LONG_URL_QUERY: &str =
    formatcp!("SELECT {URL_COLUMNS} FROM {SHORT_URL_TABLE_NAME} WHERE long_url = $1");
const LIST_URLS_QUERY: &str =
    formatcp!("SELECT {URL_COLUMNS} FROM {SHORT_URL_TABLE_NAME} ORDER BY id");
const DELETE_URL_QUERY: &str = formatcp!("DELETE FROM {SHORT_URL_TABLE_NAME} WHERE id = $1");

const ABOUT_TABLE_NAME: &str = "about_page";
const CREATE_ABOUT_TABLE_QUERY: &str = formatcp!(
    r#"
    CREATE TABLE IF NOT EXISTS {ABOUT_TABLE_NAME} (
        id smallint PRIMARY KEY CHECK (id = 1),
        content_file_name text NOT NULL,
        last_updated timestamptz,
        last_updated_by bigint
    )
"#,
);
const SEED_ABOUT_QUERY: &str = formatcp!(
    r#"
    INSERT INTO {ABOUT_TABLE_NAME} (id, content_file_name)
    VALUES (1, '{DEFAULT_ABOUT_FILE_NAME}')
    ON CONFLICT (id) DO NOTHING
"#,
);
const GET_ABOUT_QUERY: &str = formatcp!(
    "SELECT content_file_name, last_updated, last_updated_by FROM {ABOUT_TABLE_NAME} WHERE id = 1"
);
const TOUCH_ABOUT_QUERY: &str = formatcp!(
    "UPDATE {ABOUT_TABLE_NAME} SET last_updated = $1, last_updated_by = $2 WHERE id = 1"
);

#[derive(FromRow)]
struct ShortenedURLRow {
    id: i64,
    long_url: String,
    short_url: String,
    unique_code: String,
    user_id: i64,
    created_at: DateTime<Utc>,
}

impl From<ShortenedURLRow> for ShortenedURL {
    fn from(row: ShortenedURLRow) -> Self {
        ShortenedURL {
            id: row.id,
            long_url: row.long_url,
            short_url: row.short_url,
            unique_code: ShortCode::new(row.unique_code),
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AboutPageRow {
    content_file_name: String,
    last_updated: Option<DateTime<Utc>>,
    last_updated_by: Option<i64>,
}

pub struct DB {
    pub pool: PgPool,
}

impl DB {
    /// Connects with exponential backoff and bootstraps the schema.
    pub async fn new(config: Config) -> Result<Self> {
        let options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

        let retry_policy = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(5))
            .with_factor(2.0)
            .with_jitter()
            .with_max_times(5);

        let connect = || {
            let options = options.clone();
            let dsn = config.dsn.clone();
            async move { options.connect(&dsn).await }
        };

        let pool = connect
            .retry(retry_policy)
            .sleep(tokio::time::sleep)
            .notify(|err: &sqlx::Error, after: Duration| {
                tracing::warn!(error = %err, retry_in = ?after, "Postgres connection failed");
            })
            .await
            .context("failed to connect to Postgres")?;

        let db = DB { pool };
        db.bootstrap().await?;
        Ok(db)
    }

    async fn bootstrap(&self) -> Result<()> {
        for (name, statement) in [
            (SHORT_URL_TABLE_NAME, CREATE_SHORT_URL_TABLE_QUERY),
            (ABOUT_TABLE_NAME, CREATE_ABOUT_TABLE_QUERY),
            (ABOUT_TABLE_NAME, SEED_ABOUT_QUERY),
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("failed to bootstrap table '{name}'"))?;
        }
        tracing::debug!("Schema bootstrapped");
        Ok(())
    }

    async fn find_one(&self, query: &'static str, arg: &str) -> Result<Option<ShortenedURL>> {
        let row = sqlx::query_as::<_, ShortenedURLRow>(query)
            .bind(arg)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ShortenedURL::from))
    }
}

fn classify_insert_error(err: sqlx::Error) -> InsertError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some(UNIQUE_CODE_CONSTRAINT) => return InsertError::CodeTaken,
                Some(LONG_URL_CONSTRAINT) => return InsertError::LongUrlTaken,
                _ => {}
            }
        }
    }
    InsertError::Other(err.into())
}

impl CodeStore for DB {
    async fn existing_codes(&self, candidates: &[String]) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(EXISTING_CODES_QUERY)
            .bind(candidates)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(code,)| code).collect())
    }
}

impl ShortenedURLRepository for DB {
    async fn insert(&self, url: NewShortenedURL) -> Result<ShortenedURL, InsertError> {
        let row = sqlx::query_as::<_, ShortenedURLRow>(INSERT_URL_QUERY)
            .bind(&url.long_url)
            .bind(&url.short_url)
            .bind(url.unique_code.as_str())
            .bind(url.user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(classify_insert_error)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ShortenedURL>> {
        let row = sqlx::query_as::<_, ShortenedURLRow>(FIND_BY_ID_QUERY)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ShortenedURL::from))
    }

    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<ShortenedURL>> {
        self.find_one(FIND_BY_CODE_QUERY, code.as_str()).await
    }

    async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortenedURL>> {
        self.find_one(FIND_BY_LONG_URL_QUERY, long_url).await
    }

    async fn list_all(&self) -> Result<Vec<ShortenedURL>> {
        let rows = sqlx::query_as::<_, ShortenedURLRow>(LIST_URLS_QUERY)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(ShortenedURL::from).collect())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(DELETE_URL_QUERY)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl AboutPageRepository for DB {
    async fn get_about(&self) -> Result<Option<AboutPage>> {
        let row = sqlx::query_as::<_, AboutPageRow>(GET_ABOUT_QUERY)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| AboutPage {
            content_file_name: r.content_file_name,
            last_updated: r.last_updated,
            last_updated_by: r.last_updated_by,
        }))
    }

    async fn touch_about(&self, updated_at: DateTime<Utc>, updated_by: UserId) -> Result<bool> {
        let result = sqlx::query(TOUCH_ABOUT_QUERY)
            .bind(updated_at)
            .bind(updated_by)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
