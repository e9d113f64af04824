//! Admin user management.

use binwatch_api::admin::{AdminUser, CreateUserRequest, Page, UserQuery};
use binwatch_api::{ApiClient, ApiError};
use binwatch_core::validation::{validate_new_user, NewUserForm};

use crate::error::ViewError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

pub struct UserManager {
    api: ApiClient,
    query: UserQuery,
    page: Option<Page<AdminUser>>,
    error: Option<ViewError>,
}

impl UserManager {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            query: UserQuery {
                page: Some(0),
                size: Some(DEFAULT_PAGE_SIZE),
                ..Default::default()
            },
            page: None,
            error: None,
        }
    }

    pub fn query(&self) -> &UserQuery {
        &self.query
    }

    pub fn users(&self) -> &[AdminUser] {
        self.page
            .as_ref()
            .map(|p| p.content.as_slice())
            .unwrap_or_default()
    }

    pub fn page(&self) -> Option<&Page<AdminUser>> {
        self.page.as_ref()
    }

    pub fn error(&self) -> Option<&ViewError> {
        self.error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Fetch the page described by the current query.
    pub async fn load(&mut self) -> Result<(), ViewError> {
        let result = self.api.admin().list(&self.query).await;
        let page = self.check(result, "Failed to load users")?;
        tracing::debug!(total = page.total_elements, page = page.current_page, "Users loaded");
        self.page = Some(page);
        self.error = None;
        Ok(())
    }

    /// Filter by a search term, starting again from the first page.
    pub async fn search(&mut self, term: &str) -> Result<(), ViewError> {
        let term = term.trim();
        self.query.search = (!term.is_empty()).then(|| term.to_string());
        self.query.page = Some(0);
        self.load().await
    }

    /// Show only active (`Some(true)`), inactive, or all users.
    pub async fn filter_active(&mut self, is_active: Option<bool>) -> Result<(), ViewError> {
        self.query.is_active = is_active;
        self.query.page = Some(0);
        self.load().await
    }

    /// Advance one page. Returns `false` when already on the last page.
    pub async fn next_page(&mut self) -> Result<bool, ViewError> {
        match &self.page {
            Some(page) if page.has_next() => {
                self.query.page = Some(page.current_page + 1);
                self.load().await.map(|()| true)
            }
            _ => Ok(false),
        }
    }

    /// Go back one page. Returns `false` when already on the first page.
    pub async fn previous_page(&mut self) -> Result<bool, ViewError> {
        match self.query.page {
            Some(current) if current > 0 => {
                self.query.page = Some(current - 1);
                self.load().await.map(|()| true)
            }
            _ => Ok(false),
        }
    }

    /// Validate, create, then reload the current page.
    pub async fn create(&mut self, form: &NewUserForm) -> Result<AdminUser, ViewError> {
        if let Err(e) = validate_new_user(form) {
            let err = ViewError::from(e);
            self.error = Some(err.clone());
            return Err(err);
        }
        let request = CreateUserRequest {
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            password: form.password.clone().filter(|p| !p.is_empty()),
            ..Default::default()
        };
        let result = self.api.admin().create(&request).await;
        let user = self.check(result, "Failed to create user")?;
        tracing::info!(username = %user.username, "User created");
        self.load().await?;
        Ok(user)
    }

    /// Flip a user's active flag.
    pub async fn toggle_status(&mut self, id: &str) -> Result<bool, ViewError> {
        let current = self
            .users()
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.is_active)
            .ok_or_else(|| ViewError::Validation(format!("Unknown user {id}")))?;
        let result = self.api.admin().update_status(id, !current).await;
        self.check(result, "Failed to update user status")?;
        if let Some(user) = self
            .page
            .as_mut()
            .and_then(|p| p.content.iter_mut().find(|u| u.id == id))
        {
            user.is_active = !current;
        }
        Ok(!current)
    }

    pub async fn delete(&mut self, id: &str) -> Result<(), ViewError> {
        let result = self.api.admin().delete(id).await;
        self.check(result, "Failed to delete user")?;
        self.load().await
    }

    fn check<T>(&mut self, result: Result<T, ApiError>, fallback: &str) -> Result<T, ViewError> {
        result.map_err(|e| {
            let err = ViewError::from_api(&e, fallback);
            tracing::warn!(error = %e, "User action failed");
            self.error = Some(err.clone());
            err
        })
    }
}
