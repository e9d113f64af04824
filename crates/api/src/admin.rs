//! `/admin/users` endpoints.

use binwatch_core::auth::MessageResponse;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{parse_response, ApiClient};
use crate::error::ApiError;

/// A user as seen by administrators.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub locked_until: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl AdminUser {
    /// Display name, falling back to "first last", then the username.
    pub fn display(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone()
        } else {
            full
        }
    }
}

/// Body of `POST /admin/users`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

/// Body of `PUT /admin/users/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusUpdate {
    is_active: bool,
}

/// Filters and paging for [`AdminApi::list`]. Unset fields are omitted.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl UserQuery {
    fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search", search.to_string()));
        }
        if let Some(active) = self.is_active {
            params.push(("isActive", active.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(size) = self.size {
            params.push(("size", size.to_string()));
        }
        params
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub page_size: u32,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.current_page + 1 < self.total_pages
    }
}

pub struct AdminApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AdminApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, query: &UserQuery) -> Result<Page<AdminUser>, ApiError> {
        let response = self
            .client
            .request(Method::GET, "/admin/users")
            .query(&query.to_params())
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn get(&self, id: &str) -> Result<AdminUser, ApiError> {
        self.client.get_json(&format!("/admin/users/{id}")).await
    }

    pub async fn create(&self, request: &CreateUserRequest) -> Result<AdminUser, ApiError> {
        self.client.send_json(Method::POST, "/admin/users", request).await
    }

    pub async fn update(&self, id: &str, request: &UpdateUserRequest) -> Result<AdminUser, ApiError> {
        self.client
            .send_json(Method::PUT, &format!("/admin/users/{id}"), request)
            .await
    }

    pub async fn update_status(&self, id: &str, is_active: bool) -> Result<MessageResponse, ApiError> {
        self.client
            .send_json(
                Method::PATCH,
                &format!("/admin/users/{id}/status"),
                &StatusUpdate { is_active },
            )
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<MessageResponse, ApiError> {
        self.client.delete_json(&format!("/admin/users/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_skip_unset_and_empty() {
        let query = UserQuery {
            search: Some(String::new()),
            is_active: Some(false),
            page: Some(2),
            size: None,
        };
        assert_eq!(
            query.to_params(),
            vec![("isActive", "false".to_string()), ("page", "2".to_string())]
        );
    }

    #[test]
    fn display_name_fallbacks() {
        let mut user: AdminUser =
            serde_json::from_str(r#"{"id":"1","username":"op","email":"op@x.io"}"#).unwrap();
        assert_eq!(user.display(), "op");
        user.first_name = Some("Ana".into());
        assert_eq!(user.display(), "Ana");
        user.last_name = Some("Tran".into());
        assert_eq!(user.display(), "Ana Tran");
        user.display_name = Some("Chief".into());
        assert_eq!(user.display(), "Chief");
    }

    #[test]
    fn page_defaults_and_next() {
        let page: Page<AdminUser> =
            serde_json::from_str(r#"{"content":[],"totalPages":3,"currentPage":1}"#).unwrap();
        assert!(page.has_next());
        assert_eq!(page.page_size, 0);
    }
}
