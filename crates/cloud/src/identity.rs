use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ServiceError, ServiceResult};
use crate::protocol::JsonProtocolClient;

pub const NEW_PASSWORD_REQUIRED: &str = "NEW_PASSWORD_REQUIRED";

/// Result of a credential check or challenge response
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated,
    Challenge { name: String, session: String },
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<AuthOutcome>;

    async fn respond_to_new_password(
        &self,
        session: &str,
        username: &str,
        new_password: &str,
    ) -> ServiceResult<AuthOutcome>;

    async fn list_groups(&self, username: &str) -> ServiceResult<Vec<String>>;
}

/// Cognito user pool, admin (server-side) auth flow.
pub struct CognitoClient {
    protocol: JsonProtocolClient,
    user_pool_id: String,
    client_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AdminInitiateAuthRequest<'a> {
    user_pool_id: &'a str,
    client_id: &'a str,
    auth_flow: &'static str,
    auth_parameters: HashMap<&'static str, &'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RespondToAuthChallengeRequest<'a> {
    client_id: &'a str,
    challenge_name: &'static str,
    session: &'a str,
    challenge_responses: HashMap<&'static str, &'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthResponse {
    #[serde(default)]
    challenge_name: Option<String>,
    #[serde(default)]
    session: Option<String>,
    #[serde(default)]
    authentication_result: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListGroupsRequest<'a> {
    username: &'a str,
    user_pool_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListGroupsResponse {
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Group {
    group_name: String,
}

impl AuthResponse {
    fn into_outcome(self) -> ServiceResult<AuthOutcome> {
        if let Some(name) = self.challenge_name {
            return Ok(AuthOutcome::Challenge {
                name,
                session: self.session.unwrap_or_default(),
            });
        }
        if self.authentication_result.is_some() {
            return Ok(AuthOutcome::Authenticated);
        }
        Err(ServiceError::Decode {
            service: "cognito-idp",
            reason: "response has neither a challenge nor an authentication result".to_string(),
        })
    }
}

impl CognitoClient {
    pub fn new(
        base_url: String,
        user_pool_id: String,
        client_id: String,
        client: reqwest::Client,
    ) -> Self {
        Self {
            protocol: JsonProtocolClient::new(
                base_url,
                "cognito-idp",
                "AWSCognitoIdentityProviderService",
                "1.1",
                client,
            ),
            user_pool_id,
            client_id,
        }
    }
}

#[async_trait]
impl IdentityProvider for CognitoClient {
    async fn authenticate(&self, username: &str, password: &str) -> ServiceResult<AuthOutcome> {
        let request = AdminInitiateAuthRequest {
            user_pool_id: &self.user_pool_id,
            client_id: &self.client_id,
            auth_flow: "ADMIN_NO_SRP_AUTH",
            auth_parameters: HashMap::from([("USERNAME", username), ("PASSWORD", password)]),
        };

        let response: AuthResponse = self.protocol.call("AdminInitiateAuth", &request).await?;
        response.into_outcome()
    }

    async fn respond_to_new_password(
        &self,
        session: &str,
        username: &str,
        new_password: &str,
    ) -> ServiceResult<AuthOutcome> {
        let request = RespondToAuthChallengeRequest {
            client_id: &self.client_id,
            challenge_name: NEW_PASSWORD_REQUIRED,
            session,
            challenge_responses: HashMap::from([
                ("USERNAME", username),
                ("NEW_PASSWORD", new_password),
            ]),
        };

        let response: AuthResponse = self
            .protocol
            .call("RespondToAuthChallenge", &request)
            .await?;
        response.into_outcome()
    }

    async fn list_groups(&self, username: &str) -> ServiceResult<Vec<String>> {
        let request = ListGroupsRequest {
            username,
            user_pool_id: &self.user_pool_id,
        };

        let response: ListGroupsResponse = self
            .protocol
            .call("AdminListGroupsForUser", &request)
            .await?;
        Ok(response.groups.into_iter().map(|g| g.group_name).collect())
    }
}
