use anyhow::bail;
use rand::{CryptoRng, RngCore};
use url::Url;

use crate::{
    domain::{
        code::{MAX_CODE_LENGTH, ShortCode},
        error::{DomainError, InsertError},
        generator::CodeGenerator,
        models::{Actor, NewShortenedURL, ShortenedURL},
        repository::ShortenedURLRepository,
        validation::validate_long_url,
    },
    usecase::config::Config,
};

/// Inserts tried per shorten request when another writer takes our code first.
pub const INSERT_ATTEMPTS: usize = 3;

const NOT_FOUND: &str = "Shortened URL not found";

pub struct URLUsecase<R: ShortenedURLRepository> {
    url_repo: R,
    generator: CodeGenerator,
    base_url: String,
    code_length: usize,
}

impl<R: ShortenedURLRepository> URLUsecase<R> {
    pub fn new(url_repo: R, config: Config) -> anyhow::Result<Self> {
        if config.code_length == 0 || config.code_length > MAX_CODE_LENGTH {
            bail!(
                "CODE_LENGTH must be between 1 and {MAX_CODE_LENGTH}, got {}",
                config.code_length
            );
        }

        let base = Url::parse(&config.base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            bail!("BASE_URL must be an http(s) URL, got {}", config.base_url);
        }
        let mut base_url = config.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(URLUsecase {
            url_repo,
            generator: CodeGenerator::new(),
            base_url,
            code_length: config.code_length,
        })
    }

    pub fn with_generator(mut self, generator: CodeGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub async fn shorten<G: RngCore + CryptoRng>(
        &self,
        rng: &mut G,
        long_url: &str,
        actor: &Actor,
    ) -> Result<ShortenedURL, DomainError> {
        let long_url = long_url.trim();
        validate_long_url(long_url).map_err(DomainError::Validation)?;

        if self.url_repo.find_by_long_url(long_url).await?.is_some() {
            return Err(DomainError::Conflict(
                "Shortened URL already exists for the provided long URL",
            ));
        }

        for attempt in 1..=INSERT_ATTEMPTS {
            let code = self
                .generator
                .generate(&self.url_repo, rng, self.code_length)
                .await?;

            let new_url = NewShortenedURL {
                long_url: long_url.to_string(),
                short_url: format!("{}{}", self.base_url, code),
                unique_code: code,
                user_id: actor.user_id,
            };

            match self.url_repo.insert(new_url).await {
                Ok(shortened) => {
                    tracing::info!(
                        event = "short_url_created",
                        id = shortened.id,
                        code = shortened.unique_code.as_str(),
                        user_id = shortened.user_id,
                        long_url = shortened.long_url.as_str()
                    );
                    return Ok(shortened);
                }
                Err(InsertError::CodeTaken) => {
                    tracing::warn!(attempt, "Unique code was taken before insert, regenerating");
                }
                Err(InsertError::LongUrlTaken) => {
                    return Err(DomainError::Conflict(
                        "Shortened URL already exists for the provided long URL",
                    ));
                }
                Err(InsertError::Other(e)) => return Err(e.into()),
            }
        }

        Err(DomainError::InsertAttemptsExhausted {
            attempts: INSERT_ATTEMPTS,
        })
    }

    /// Long URL behind `code`.
    pub async fn resolve(&self, code: &str) -> Result<String, DomainError> {
        let Some(code) = ShortCode::parse(code) else {
            tracing::info!(event = "short_url_access", code, found = false);
            return Err(DomainError::NotFound(NOT_FOUND));
        };

        let url = self.url_repo.find_by_code(&code).await?;
        tracing::info!(
            event = "short_url_access",
            code = code.as_str(),
            found = url.is_some()
        );
        url.map(|u| u.long_url)
            .ok_or(DomainError::NotFound(NOT_FOUND))
    }

    pub async fn get(&self, id: i64) -> Result<ShortenedURL, DomainError> {
        self.url_repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound(NOT_FOUND))
    }

    pub async fn list(&self) -> Result<Vec<ShortenedURL>, DomainError> {
        Ok(self.url_repo.list_all().await?)
    }

    /// Owners may delete their own links; admins may delete any.
    pub async fn delete(&self, id: i64, actor: &Actor) -> Result<(), DomainError> {
        let url = self.get(id).await?;
        if url.user_id != actor.user_id && !actor.is_admin() {
            tracing::warn!(
                id,
                user_id = actor.user_id,
                "Refused to delete a link owned by someone else"
            );
            return Err(DomainError::Forbidden);
        }

        // Gone already if a concurrent delete won.
        if !self.url_repo.delete(id).await? {
            return Err(DomainError::NotFound(NOT_FOUND));
        }
        tracing::info!(event = "short_url_deleted", id, user_id = actor.user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::code::tests::ScriptedRng;
    use crate::domain::code::{Alphabet, DEFAULT_CODE_LENGTH};
    use crate::domain::error::ErrorKind;
    use crate::domain::models::Role;
    use crate::domain::repository::CodeStore;
    use crate::memory::db::DB;
    use anyhow::Result;
    use rand::rngs::OsRng;
    use std::collections::HashSet;
    use std::sync::Mutex;

    fn config() -> Config {
        Config {
            base_url: "https://sho.rt".to_string(),
            code_length: DEFAULT_CODE_LENGTH,
        }
    }

    fn usecase() -> URLUsecase<DB> {
        URLUsecase::new(DB::new(), config()).unwrap()
    }

    const ALICE: Actor = Actor {
        user_id: 1,
        role: Role::User,
    };
    const BOB: Actor = Actor {
        user_id: 2,
        role: Role::User,
    };
    const ADMIN: Actor = Actor {
        user_id: 99,
        role: Role::Admin,
    };

    #[test]
    fn test_rejects_bad_config() {
        for code_length in [0, MAX_CODE_LENGTH + 1] {
            let cfg = Config {
                code_length,
                ..config()
            };
            assert!(URLUsecase::new(DB::new(), cfg).is_err());
        }

        let cfg = Config {
            base_url: "ftp://sho.rt/".to_string(),
            ..config()
        };
        assert!(URLUsecase::new(DB::new(), cfg).is_err());
    }

    #[tokio::test]
    async fn test_shorten_and_resolve() {
        let uc = usecase();
        let url = uc
            .shorten(&mut OsRng, "  https://example.com/page  ", &ALICE)
            .await
            .unwrap();

        assert_eq!(url.long_url, "https://example.com/page");
        assert_eq!(url.user_id, ALICE.user_id);
        assert_eq!(url.unique_code.as_str().len(), DEFAULT_CODE_LENGTH);
        assert_eq!(url.short_url, format!("https://sho.rt/{}", url.unique_code));

        let target = uc.resolve(url.unique_code.as_str()).await.unwrap();
        assert_eq!(target, "https://example.com/page");
    }

    #[tokio::test]
    async fn test_shorten_validation() {
        let uc = usecase();
        for bad in ["", "   ", "not a url", "ftp://example.com/file"] {
            let err = uc.shorten(&mut OsRng, bad, &ALICE).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{bad:?}");
        }
        assert!(uc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_long_url_conflicts() {
        let uc = usecase();
        uc.shorten(&mut OsRng, "https://example.com", &ALICE)
            .await
            .unwrap();
        let err = uc
            .shorten(&mut OsRng, "https://example.com", &BOB)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_resolve_unknown_codes() {
        let uc = usecase();
        for code in ["abc123", "way-too-long-code", "", "a/b"] {
            let err = uc.resolve(code).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let uc = usecase();
        let a = uc
            .shorten(&mut OsRng, "https://a.example", &ALICE)
            .await
            .unwrap();
        let b = uc
            .shorten(&mut OsRng, "https://b.example", &ALICE)
            .await
            .unwrap();

        let err = uc.delete(a.id, &BOB).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        uc.delete(a.id, &ALICE).await.unwrap();
        uc.delete(b.id, &ADMIN).await.unwrap();

        let err = uc.delete(a.id, &ALICE).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(uc.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let uc = usecase();
        let a = uc
            .shorten(&mut OsRng, "https://a.example", &ALICE)
            .await
            .unwrap();
        uc.shorten(&mut OsRng, "https://b.example", &BOB)
            .await
            .unwrap();

        assert_eq!(uc.get(a.id).await.unwrap(), a);
        assert_eq!(uc.get(12345).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(uc.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_keyspace_is_retryable() {
        let uc = URLUsecase::new(
            DB::new(),
            Config {
                code_length: 1,
                ..config()
            },
        )
        .unwrap()
        .with_generator(CodeGenerator::new().with_alphabet(Alphabet::new("x").unwrap()));

        uc.shorten(&mut OsRng, "https://a.example", &ALICE)
            .await
            .unwrap();
        let err = uc
            .shorten(&mut OsRng, "https://b.example", &ALICE)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    /// Hides issued codes from the pre-check, like a writer that inserted
    /// the same code between our check and our insert.
    struct RacingRepo {
        inner: DB,
        hidden_checks: Mutex<usize>,
    }

    impl CodeStore for RacingRepo {
        async fn existing_codes(&self, candidates: &[String]) -> Result<HashSet<String>> {
            let mut hidden = self.hidden_checks.lock().unwrap();
            if *hidden > 0 {
                *hidden -= 1;
                return Ok(HashSet::new());
            }
            drop(hidden);
            self.inner.existing_codes(candidates).await
        }
    }

    impl ShortenedURLRepository for RacingRepo {
        async fn insert(&self, url: NewShortenedURL) -> Result<ShortenedURL, InsertError> {
            self.inner.insert(url).await
        }
        async fn find_by_id(&self, id: i64) -> Result<Option<ShortenedURL>> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_code(&self, code: &ShortCode) -> Result<Option<ShortenedURL>> {
            self.inner.find_by_code(code).await
        }
        async fn find_by_long_url(&self, long_url: &str) -> Result<Option<ShortenedURL>> {
            self.inner.find_by_long_url(long_url).await
        }
        async fn list_all(&self) -> Result<Vec<ShortenedURL>> {
            self.inner.list_all().await
        }
        async fn delete(&self, id: i64) -> Result<bool> {
            self.inner.delete(id).await
        }
    }

    #[tokio::test]
    async fn test_lost_insert_race_regenerates() {
        let inner = DB::new();
        inner
            .insert(NewShortenedURL {
                long_url: "https://first.example".to_string(),
                short_url: "https://sho.rt/AAAAAA".to_string(),
                unique_code: ShortCode::new("AAAAAA".to_string()),
                user_id: BOB.user_id,
            })
            .await
            .unwrap();
        let repo = RacingRepo {
            inner,
            hidden_checks: Mutex::new(1),
        };
        let uc = URLUsecase::new(repo, config()).unwrap();

        // First batch: "AAAAAA" passes the blind check but the insert is rejected.
        // Second batch: "AAAAAA" is now seen as taken, "BBBBBB" wins.
        let mut script = vec!["AAAAAA"; 10];
        script.extend(["AAAAAA", "BBBBBB"]);
        let mut rng = ScriptedRng::spelling(&script);

        let url = uc
            .shorten(&mut rng, "https://second.example", &ALICE)
            .await
            .unwrap();
        assert_eq!(url.unique_code.as_str(), "BBBBBB");
    }

    #[tokio::test]
    async fn test_lost_insert_race_gives_up() {
        let inner = DB::new();
        inner
            .insert(NewShortenedURL {
                long_url: "https://first.example".to_string(),
                short_url: "https://sho.rt/AAAAAA".to_string(),
                unique_code: ShortCode::new("AAAAAA".to_string()),
                user_id: BOB.user_id,
            })
            .await
            .unwrap();
        let repo = RacingRepo {
            inner,
            hidden_checks: Mutex::new(INSERT_ATTEMPTS),
        };
        let uc = URLUsecase::new(repo, config()).unwrap();

        // Every draw is 0: each attempt picks "AAAAAA" and loses at insert.
        let mut rng = ScriptedRng::new([0u32; 0]);
        let err = uc
            .shorten(&mut rng, "https://second.example", &ALICE)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::InsertAttemptsExhausted {
                attempts: INSERT_ATTEMPTS
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(
            err.to_string(),
            "unique code was taken at insert on all 3 attempts"
        );
    }
}
