use chrono::Utc;

use crate::domain::{
    error::DomainError,
    models::{AboutPageView, Actor},
    repository::{AboutPageRepository, ContentStore},
};

const NOT_FOUND: &str = "About page not found";

pub struct AboutUsecase<R: AboutPageRepository, C: ContentStore> {
    about_repo: R,
    contents: C,
}

impl<R: AboutPageRepository, C: ContentStore> AboutUsecase<R, C> {
    pub fn new(about_repo: R, contents: C) -> Self {
        AboutUsecase {
            about_repo,
            contents,
        }
    }

    pub async fn get(&self) -> Result<AboutPageView, DomainError> {
        let page = self
            .about_repo
            .get_about()
            .await?
            .ok_or(DomainError::NotFound(NOT_FOUND))?;

        let content = self
            .contents
            .read(&page.content_file_name)
            .await?
            .unwrap_or_default();

        Ok(AboutPageView {
            content,
            last_updated_at: page.last_updated,
            last_updated_by: page.last_updated_by,
        })
    }

    pub async fn update(&self, actor: &Actor, content: &str) -> Result<(), DomainError> {
        if !actor.is_admin() {
            return Err(DomainError::Forbidden);
        }
        if content.trim().is_empty() {
            return Err(DomainError::Validation("Content is required.".to_string()));
        }

        let page = self
            .about_repo
            .get_about()
            .await?
            .ok_or(DomainError::NotFound(NOT_FOUND))?;

        self.contents
            .write(&page.content_file_name, content)
            .await?;
        if !self.about_repo.touch_about(Utc::now(), actor.user_id).await? {
            return Err(DomainError::NotFound(NOT_FOUND));
        }

        tracing::info!(
            event = "about_page_updated",
            user_id = actor.user_id,
            bytes = content.len()
        );
        Ok(())
    }
}
