//! Slack Web API over HTTPS
//!
//! Every method is a form-encoded `POST {base}/{method}` with the bot token
//! as bearer auth. Responses carry `{"ok": bool, "error"?: code, ...}`; the
//! payload lives under a method specific field.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::domain::{SlackUser, UserGroup, UserGroupReq, Workspace};
use crate::error::{SlackError, SlackResult};
use crate::ports::SlackApi;

/// Public Slack Web API endpoint.
pub const DEFAULT_API_URL: &str = "https://slack.com/api";

/// [`SlackApi`] backed by `reqwest`.
#[derive(Clone)]
pub struct HttpSlackApi {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for HttpSlackApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSlackApi")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl HttpSlackApi {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_API_URL, token, reqwest::Client::new())
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            http,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
        field: &str,
    ) -> SlackResult<T> {
        let url = format!("{}/{}", self.base_url, method);
        debug!(method, "calling slack api");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .form(params)
            .send()
            .await
            .map_err(|e| SlackError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(SlackError::ServiceUnavailable);
        }
        if !status.is_success() {
            return Err(SlackError::Transport(format!("{method}: http status {status}")));
        }

        let mut body: Value = response
            .json()
            .await
            .map_err(|e| SlackError::Decode(e.to_string()))?;

        if !body.get("ok").and_then(Value::as_bool).unwrap_or(false) {
            let code = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(SlackError::Api(code.to_string()));
        }

        let payload = body
            .get_mut(field)
            .map(Value::take)
            .ok_or_else(|| SlackError::Decode(format!("{method}: missing field {field}")))?;

        serde_json::from_value(payload).map_err(|e| SlackError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SlackApi for HttpSlackApi {
    async fn list_teams(&self, limit: u32) -> SlackResult<Vec<Workspace>> {
        self.call("auth.teams.list", &[("limit", limit.to_string())], "teams")
            .await
    }

    async fn create_user_group(
        &self,
        team_id: &str,
        name: &str,
        handle: &str,
        description: Option<&str>,
    ) -> SlackResult<UserGroup> {
        let mut params = vec![
            ("team_id", team_id.to_string()),
            ("name", name.to_string()),
            ("handle", handle.to_string()),
        ];
        if let Some(description) = description {
            params.push(("description", description.to_string()));
        }

        self.call("usergroups.create", &params, "usergroup").await
    }

    async fn update_user_group(
        &self,
        group_id: &str,
        team_id: &str,
        req: &UserGroupReq,
    ) -> SlackResult<UserGroup> {
        let mut params = vec![
            ("usergroup", group_id.to_string()),
            ("team_id", team_id.to_string()),
        ];
        if let Some(name) = &req.name {
            params.push(("name", name.clone()));
        }
        if let Some(handle) = &req.handle {
            params.push(("handle", handle.clone()));
        }
        if let Some(description) = &req.description {
            params.push(("description", description.clone()));
        }

        self.call("usergroups.update", &params, "usergroup").await
    }

    async fn disable_user_group(&self, group_id: &str, team_id: &str) -> SlackResult<UserGroup> {
        let params = [
            ("usergroup", group_id.to_string()),
            ("team_id", team_id.to_string()),
            ("include_count", "true".to_string()),
        ];
        self.call("usergroups.disable", &params, "usergroup").await
    }

    async fn enable_user_group(&self, group_id: &str, team_id: &str) -> SlackResult<UserGroup> {
        let params = [
            ("usergroup", group_id.to_string()),
            ("team_id", team_id.to_string()),
            ("include_count", "true".to_string()),
        ];
        self.call("usergroups.enable", &params, "usergroup").await
    }

    async fn list_user_groups(
        &self,
        team_id: &str,
        include_disabled: bool,
    ) -> SlackResult<Vec<UserGroup>> {
        let params = [
            ("team_id", team_id.to_string()),
            ("include_disabled", include_disabled.to_string()),
            ("include_count", "true".to_string()),
            ("include_users", "true".to_string()),
        ];
        self.call("usergroups.list", &params, "usergroups").await
    }

    async fn list_user_group_members(
        &self,
        group_id: &str,
        team_id: &str,
        include_disabled: bool,
    ) -> SlackResult<Vec<String>> {
        let params = [
            ("usergroup", group_id.to_string()),
            ("team_id", team_id.to_string()),
            ("include_disabled", include_disabled.to_string()),
        ];
        self.call("usergroups.users.list", &params, "users").await
    }

    async fn update_user_group_members(
        &self,
        group_id: &str,
        team_id: &str,
        users: &str,
    ) -> SlackResult<UserGroup> {
        let params = [
            ("usergroup", group_id.to_string()),
            ("team_id", team_id.to_string()),
            ("users", users.to_string()),
            ("include_count", "true".to_string()),
        ];
        self.call("usergroups.users.update", &params, "usergroup")
            .await
    }

    async fn user_info(&self, user_id: &str) -> SlackResult<SlackUser> {
        self.call("users.info", &[("user", user_id.to_string())], "user")
            .await
    }

    async fn lookup_user_by_email(&self, email: &str) -> SlackResult<SlackUser> {
        self.call("users.lookupByEmail", &[("email", email.to_string())], "user")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> HttpSlackApi {
        HttpSlackApi::with_base_url(server.uri(), "xoxb-test", reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_list_teams() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth.teams.list"))
            .and(header("Authorization", "Bearer xoxb-test"))
            .and(body_string_contains("limit=100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "teams": [{"id": "T1", "name": "Acme"}, {"id": "T2", "name": "Acme Labs"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let teams = api(&server).list_teams(100).await.unwrap();

        assert_eq!(teams.len(), 2);
        assert_eq!(teams[1].name, "Acme Labs");
    }

    #[tokio::test]
    async fn test_api_error_code_is_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/usergroups.create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false,
                "error": "name_already_exists"
            })))
            .mount(&server)
            .await;

        let err = api(&server)
            .create_user_group("T1", "[Governor] Ops", "ops", None)
            .await
            .unwrap_err();

        assert_eq!(err, SlackError::Api("name_already_exists".into()));
    }

    #[tokio::test]
    async fn test_service_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users.lookupByEmail"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = api(&server)
            .lookup_user_by_email("alice@example.com")
            .await
            .unwrap_err();

        assert_eq!(err, SlackError::ServiceUnavailable);
    }

    #[tokio::test]
    async fn test_update_members_sends_joined_list() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/usergroups.users.update"))
            .and(body_string_contains("users=U1%2CU2"))
            .and(body_string_contains("usergroup=S1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "usergroup": {"id": "S1", "team_id": "T1", "name": "n", "handle": "h", "users": ["U1", "U2"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let ug = api(&server)
            .update_user_group_members("S1", "T1", "U1,U2")
            .await
            .unwrap();

        assert_eq!(ug.users, vec!["U1".to_string(), "U2".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_payload_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users.info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let err = api(&server).user_info("U1").await.unwrap_err();

        assert!(matches!(err, SlackError::Decode(_)));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/usergroups.list"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = api(&server).list_user_groups("T1", false).await.unwrap_err();

        assert!(matches!(err, SlackError::Transport(_)));
    }
}
