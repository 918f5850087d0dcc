//! Governor REST client (`/api/v1alpha1`)

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use shared_types::{Application, ApplicationType, Group, GroupMember, User};
use tracing::debug;

use crate::auth::TokenSource;
use crate::error::{GovernorError, GovernorResult};
use crate::ports::GovernorApi;

const API_PREFIX: &str = "api/v1alpha1";

/// [`GovernorApi`] over HTTP with bearer tokens from a [`TokenSource`].
#[derive(Debug, Clone)]
pub struct HttpGovernorClient {
    url: String,
    tokens: TokenSource,
    http: reqwest::Client,
}

impl HttpGovernorClient {
    pub fn new(url: impl Into<String>, tokens: TokenSource, http: reqwest::Client) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            tokens,
            http,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, deleted: bool) -> GovernorResult<T> {
        let url = format!("{}/{}/{}", self.url, API_PREFIX, path);
        let token = self.tokens.token().await?;

        debug!(url = %url, deleted, "requesting governor resource");

        let mut request = self.http.get(&url).bearer_auth(token);
        if deleted {
            request = request.query(&[("deleted", "true")]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GovernorError::Transport(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| GovernorError::Decode(e.to_string())),
            StatusCode::NOT_FOUND => Err(GovernorError::NotFound),
            StatusCode::UNAUTHORIZED => {
                self.tokens.invalidate().await;
                Err(GovernorError::Auth(format!("{url}: unauthorized")))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(GovernorError::Http {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

fn require(id: &str) -> GovernorResult<&str> {
    if id.is_empty() {
        Err(GovernorError::BadParameter)
    } else {
        Ok(id)
    }
}

#[async_trait]
impl GovernorApi for HttpGovernorClient {
    async fn application(&self, id: &str) -> GovernorResult<Application> {
        let id = require(id)?;
        self.get(&format!("applications/{id}"), false).await
    }

    async fn applications(&self) -> GovernorResult<Vec<Application>> {
        self.get("applications", false).await
    }

    async fn application_types(&self) -> GovernorResult<Vec<ApplicationType>> {
        self.get("application-types", false).await
    }

    async fn application_groups(&self, id: &str) -> GovernorResult<Vec<Group>> {
        let id = require(id)?;
        self.get(&format!("applications/{id}/groups"), false).await
    }

    async fn group(&self, id: &str, deleted: bool) -> GovernorResult<Group> {
        let id = require(id)?;
        self.get(&format!("groups/{id}"), deleted).await
    }

    async fn group_members(&self, id: &str) -> GovernorResult<Vec<GroupMember>> {
        let id = require(id)?;
        self.get(&format!("groups/{id}/members"), false).await
    }

    async fn user(&self, id: &str, deleted: bool) -> GovernorResult<User> {
        let id = require(id)?;
        self.get(&format!("users/{id}"), deleted).await
    }

    fn url(&self) -> &str {
        &self.url
    }
}
