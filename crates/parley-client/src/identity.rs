//! Identity service: OTP issue/verify, user registration, session resolution.

use async_trait::async_trait;
use parley_core::{AuthStep, Profile};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::http::{check_status, endpoint, with_bearer};

/// Outcome of a successful OTP check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpVerification {
    /// The phone number already belongs to a registered user.
    pub existing_user: bool,
    /// Registered display name, present for existing users.
    pub name: Option<String>,
    /// Step the service expects next, informational only.
    pub auth_state: Option<AuthStep>,
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Bearer token for the transcript surface. Never empty.
    pub token: String,
    pub auth_state: Option<AuthStep>,
}

/// The identity REST surface.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Ask the service to deliver an OTP to `phone`.
    async fn request_otp(&self, phone: &str) -> Result<(), ClientError>;

    /// Check an OTP previously delivered to `phone`.
    async fn verify_otp(&self, phone: &str, otp: &str) -> Result<OtpVerification, ClientError>;

    /// Register (or re-register) `user_id` and obtain a fresh token.
    /// Idempotent per `user_id`.
    async fn register_user(
        &self,
        user_id: &str,
        name: &str,
        phone: &str,
    ) -> Result<Registration, ClientError>;

    /// Resolve a stored token into the user's profile.
    async fn resolve_session(&self, user_id: &str, token: &str) -> Result<Profile, ClientError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendOtpRequest<'a> {
    phone_number: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOtpRequest<'a> {
    phone_number: &'a str,
    otp: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOtpResponse {
    #[serde(default)]
    existing_user: bool,
    #[serde(default, alias = "authStep")]
    auth_state: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterUserRequest<'a> {
    user_id: &'a str,
    name: &'a str,
    number: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterUserResponse {
    token: String,
    #[serde(default, alias = "authStep")]
    auth_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    name: String,
    number: String,
}

/// A 2xx body may still carry `{ "error": ... }`.
fn inline_error(body: &Value, status: u16) -> Result<(), ClientError> {
    match body.get("error").and_then(Value::as_str) {
        Some(message) => Err(ClientError::Rejected {
            status,
            message: message.to_string(),
        }),
        None => Ok(()),
    }
}

/// HTTP implementation of [`IdentityService`].
#[derive(Clone)]
pub struct HttpIdentityClient {
    client: Client,
    base_url: String,
}

impl HttpIdentityClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IdentityService for HttpIdentityClient {
    async fn request_otp(&self, phone: &str) -> Result<(), ClientError> {
        let url = endpoint(&self.base_url, "send-otp");
        let response = self
            .client
            .post(&url)
            .json(&SendOtpRequest {
                phone_number: phone,
            })
            .send()
            .await?;
        let response = check_status(response).await?;
        let status = response.status().as_u16();

        // Body is `{}` on success; tolerate an empty body too.
        let text = response.text().await?;
        if !text.trim().is_empty() {
            let body: Value = serde_json::from_str(&text)?;
            inline_error(&body, status)?;
        }
        tracing::debug!("OTP requested");
        Ok(())
    }

    async fn verify_otp(&self, phone: &str, otp: &str) -> Result<OtpVerification, ClientError> {
        let url = endpoint(&self.base_url, "verify-otp");
        let response = self
            .client
            .post(&url)
            .json(&VerifyOtpRequest {
                phone_number: phone,
                otp,
            })
            .send()
            .await?;
        let response = check_status(response).await?;
        let status = response.status().as_u16();
        let body: Value = response.json().await?;
        inline_error(&body, status)?;

        let parsed: VerifyOtpResponse = serde_json::from_value(body)?;
        Ok(OtpVerification {
            existing_user: parsed.existing_user,
            name: parsed.name.filter(|n| !n.trim().is_empty()),
            auth_state: parsed.auth_state.as_deref().and_then(AuthStep::from_wire),
        })
    }

    async fn register_user(
        &self,
        user_id: &str,
        name: &str,
        phone: &str,
    ) -> Result<Registration, ClientError> {
        let url = endpoint(&self.base_url, "user");
        let response = self
            .client
            .post(&url)
            .json(&RegisterUserRequest {
                user_id,
                name,
                number: phone,
            })
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: RegisterUserResponse = response.json().await?;

        if parsed.token.trim().is_empty() {
            return Err(ClientError::Decode(
                "registration returned an empty token".to_string(),
            ));
        }
        tracing::info!(user_id = %user_id, "User registered");
        Ok(Registration {
            token: parsed.token,
            auth_state: parsed.auth_state.as_deref().and_then(AuthStep::from_wire),
        })
    }

    async fn resolve_session(&self, user_id: &str, token: &str) -> Result<Profile, ClientError> {
        let url = endpoint(&self.base_url, &format!("user/{}", user_id));
        let response = with_bearer(self.client.get(&url), token).send().await?;
        let response = check_status(response).await?;
        let user: UserResponse = response.json().await?;
        Ok(Profile {
            name: user.name,
            phone_number: user.number,
        })
    }
}
