//! HTTP implementation of the dashboard API.
//!
//! Session credentials live exclusively in the reqwest cookie jar: the
//! backend sets them on sign-in and refresh, and the jar sends them back on
//! every request. Nothing in this module ever reads a token.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use crate::domain::{
    ApiError, AppError, Application, AuthResponse, ConfigError, CreateApplicationInput,
    CreatedApplication, CurrentUser, DashboardApi, Envelope, LedgerEntry, LedgerQuery,
    PageRequest, PaginatedResponse, SignInInput, SignUpInput, UpdateApplicationInput,
    UpdateProfileInput, ValidationError, Wallet, WalletBalance,
};

use super::config::ApiClientConfig;
use super::retry::{RefreshPolicy, RetryAction};

const REFRESH_PATH: &str = "/auth/refresh-tokens";

/// Callback fired when a session cannot be recovered by refreshing
pub type SessionLostHandler = Arc<dyn Fn() + Send + Sync>;

/// A request description that can be sent more than once
#[derive(Debug, Clone)]
struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<serde_json::Value>,
}

impl ApiRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    fn query(mut self, query: Vec<(&'static str, String)>) -> Self {
        self.query = query;
        self
    }

    fn json<T: Serialize>(mut self, body: &T) -> Result<Self, AppError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

#[derive(Deserialize)]
struct UserPayload {
    user: CurrentUser,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedApplicationPayload {
    application: Application,
    api_key: String,
}

#[derive(Deserialize)]
struct ApplicationPayload {
    application: Application,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiKeyPayload {
    api_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookSecretPayload {
    webhook_secret: String,
}

#[derive(Deserialize)]
struct WalletsPayload {
    wallets: Vec<Wallet>,
}

#[derive(Deserialize)]
struct WalletPayload {
    wallet: Wallet,
}

#[derive(Deserialize)]
struct BalancePayload {
    balance: WalletBalance,
}

#[derive(Serialize)]
struct CreateWalletBody<'a> {
    currency: &'a str,
}

/// Cookie-authenticated client for the Odi Pay REST API
pub struct HttpApiClient {
    http_client: Client,
    base_url: String,
    on_session_lost: RwLock<Option<SessionLostHandler>>,
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpApiClient {
    /// Create a new client with its own cookie jar
    pub fn new(config: &ApiClientConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .cookie_store(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                AppError::Config(ConfigError::InvalidValue {
                    name: "http_client".to_string(),
                    message: e.to_string(),
                })
            })?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            on_session_lost: RwLock::new(None),
        })
    }

    /// Register the callback fired when a refresh attempt fails
    pub fn set_on_session_lost(&self, handler: SessionLostHandler) {
        let mut slot = self
            .on_session_lost
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(handler);
    }

    fn notify_session_lost(&self) {
        let handler = self
            .on_session_lost
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    async fn dispatch(&self, request: &ApiRequest) -> Result<Response, AppError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(method = %request.method, url = %url, "Sending API request");

        let mut builder = self.http_client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        builder.send().await.map_err(|e| {
            error!(error = %e, url = %url, "API request failed");
            let message = if e.is_timeout() {
                "The server took too long to respond".to_string()
            } else {
                format!("Unable to reach the server: {}", e)
            };
            AppError::Api(ApiError::Network(message))
        })
    }

    /// Send with the one-shot refresh policy applied
    async fn send(&self, request: &ApiRequest, fallback: &str) -> Result<Response, AppError> {
        let mut policy = RefreshPolicy::for_path(&request.path);
        loop {
            let response = self.dispatch(request).await?;
            match policy.on_status(response.status().as_u16()) {
                RetryAction::Accept => return Ok(response),
                RetryAction::RefreshThenRetry => {
                    let original = Self::error_from_response(response, fallback).await;
                    debug!(path = %request.path, "Session expired, attempting refresh");
                    match self.renew_session().await {
                        Ok(()) => {
                            policy.on_refresh_succeeded();
                            info!(path = %request.path, "Session refreshed, retrying request");
                        }
                        Err(e) => {
                            policy.on_refresh_failed();
                            warn!(path = %request.path, error = %e, "Session refresh failed");
                            self.notify_session_lost();
                            return Err(original);
                        }
                    }
                }
            }
        }
    }

    async fn renew_session(&self) -> Result<(), AppError> {
        let response = self.dispatch(&ApiRequest::post(REFRESH_PATH)).await?;
        Self::read_unit(response, "Failed to refresh tokens").await
    }

    async fn error_from_response(response: Response, fallback: &str) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
            .map(|envelope| envelope.failure_message(fallback))
            .unwrap_or_else(|_| fallback.to_string());

        warn!(status = %status, message = %message, "API returned error status");

        if status == StatusCode::UNAUTHORIZED {
            AppError::Api(ApiError::Unauthorized(message))
        } else {
            AppError::Api(ApiError::Status {
                status_code: status.as_u16(),
                message,
            })
        }
    }

    async fn read_data<T: DeserializeOwned>(
        response: Response,
        fallback: &str,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            return Err(Self::error_from_response(response, fallback).await);
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse API response");
            AppError::Api(ApiError::Decode(fallback.to_string()))
        })?;

        Ok(envelope.into_data(fallback)?)
    }

    async fn read_unit(response: Response, fallback: &str) -> Result<(), AppError> {
        if !response.status().is_success() {
            return Err(Self::error_from_response(response, fallback).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Api(ApiError::Network(e.to_string())))?;
        if body.trim().is_empty() {
            return Ok(());
        }

        let envelope: Envelope<serde_json::Value> = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Failed to parse API response");
            AppError::Api(ApiError::Decode(fallback.to_string()))
        })?;

        Ok(envelope.into_unit(fallback)?)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
        fallback: &str,
    ) -> Result<T, AppError> {
        let response = self.send(&request, fallback).await?;
        Self::read_data(response, fallback).await
    }

    async fn execute(&self, request: ApiRequest, fallback: &str) -> Result<(), AppError> {
        let response = self.send(&request, fallback).await?;
        Self::read_unit(response, fallback).await
    }
}

fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input.validate().map_err(|e| {
        warn!(error = %e, "Validation failed");
        AppError::from(e)
    })
}

fn require_id<'a>(field: &str, id: &'a str) -> Result<&'a str, AppError> {
    if id.trim().is_empty() {
        return Err(AppError::Validation(ValidationError::MissingField(
            field.to_string(),
        )));
    }
    Ok(id)
}

#[async_trait]
impl DashboardApi for HttpApiClient {
    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn sign_up(&self, input: &SignUpInput) -> Result<AuthResponse, AppError> {
        validate_input(input)?;
        let request = ApiRequest::post("/auth/sign-up").json(input)?;
        self.fetch(request, "Sign up failed").await
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn sign_in(&self, input: &SignInInput) -> Result<AuthResponse, AppError> {
        validate_input(input)?;
        let request = ApiRequest::post("/auth/sign-in").json(input)?;
        self.fetch(request, "Sign in failed").await
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AppError> {
        self.execute(ApiRequest::post("/auth/sign-out"), "Sign out failed")
            .await
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<CurrentUser, AppError> {
        let payload: UserPayload = self
            .fetch(ApiRequest::get("/auth/me"), "Failed to fetch current user")
            .await?;
        Ok(payload.user)
    }

    #[instrument(skip(self, input))]
    async fn update_profile(&self, input: &UpdateProfileInput) -> Result<CurrentUser, AppError> {
        validate_input(input)?;
        let request = ApiRequest::patch("/auth/me").json(input)?;
        let payload: UserPayload = self.fetch(request, "Failed to update profile").await?;
        Ok(payload.user)
    }

    #[instrument(skip(self))]
    async fn refresh_session(&self) -> Result<(), AppError> {
        self.renew_session().await
    }

    #[instrument(skip(self))]
    async fn list_applications(
        &self,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Application>, AppError> {
        let request = ApiRequest::get("/applications").query(page.to_query());
        self.fetch(request, "Failed to fetch applications").await
    }

    #[instrument(skip(self))]
    async fn get_application(&self, id: &str) -> Result<Application, AppError> {
        let id = require_id("applicationId", id)?;
        let payload: ApplicationPayload = self
            .fetch(
                ApiRequest::get(format!("/applications/{}", id)),
                "Failed to fetch application",
            )
            .await?;
        Ok(payload.application)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    async fn create_application(
        &self,
        input: &CreateApplicationInput,
    ) -> Result<CreatedApplication, AppError> {
        validate_input(input)?;
        let request = ApiRequest::post("/applications").json(input)?;
        let payload: CreatedApplicationPayload =
            self.fetch(request, "Failed to create application").await?;

        info!(id = %payload.application.id, "Application created");

        Ok(CreatedApplication {
            application: payload.application,
            api_key: SecretString::from(payload.api_key),
        })
    }

    #[instrument(skip(self, input))]
    async fn update_application(
        &self,
        id: &str,
        input: &UpdateApplicationInput,
    ) -> Result<Application, AppError> {
        validate_input(input)?;
        let id = require_id("applicationId", id)?;
        let request = ApiRequest::patch(format!("/applications/{}", id)).json(input)?;
        let payload: ApplicationPayload =
            self.fetch(request, "Failed to update application").await?;
        Ok(payload.application)
    }

    #[instrument(skip(self))]
    async fn suspend_application(&self, id: &str) -> Result<Application, AppError> {
        let id = require_id("applicationId", id)?;
        let payload: ApplicationPayload = self
            .fetch(
                ApiRequest::post(format!("/applications/{}/suspend", id)),
                "Failed to suspend application",
            )
            .await?;
        Ok(payload.application)
    }

    #[instrument(skip(self))]
    async fn activate_application(&self, id: &str) -> Result<Application, AppError> {
        let id = require_id("applicationId", id)?;
        let payload: ApplicationPayload = self
            .fetch(
                ApiRequest::post(format!("/applications/{}/activate", id)),
                "Failed to activate application",
            )
            .await?;
        Ok(payload.application)
    }

    #[instrument(skip(self))]
    async fn delete_application(&self, id: &str) -> Result<(), AppError> {
        let id = require_id("applicationId", id)?;
        self.execute(
            ApiRequest::delete(format!("/applications/{}", id)),
            "Failed to delete application",
        )
        .await
    }

    #[instrument(skip(self))]
    async fn rotate_api_key(&self, id: &str) -> Result<SecretString, AppError> {
        let id = require_id("applicationId", id)?;
        let payload: ApiKeyPayload = self
            .fetch(
                ApiRequest::post(format!("/applications/{}/rotate-key", id)),
                "Failed to rotate API key",
            )
            .await?;
        Ok(SecretString::from(payload.api_key))
    }

    #[instrument(skip(self))]
    async fn regenerate_webhook_secret(&self, id: &str) -> Result<SecretString, AppError> {
        let id = require_id("applicationId", id)?;
        let payload: WebhookSecretPayload = self
            .fetch(
                ApiRequest::post(format!("/applications/{}/regenerate-webhook-secret", id)),
                "Failed to regenerate webhook secret",
            )
            .await?;
        Ok(SecretString::from(payload.webhook_secret))
    }

    #[instrument(skip(self))]
    async fn list_wallets(&self) -> Result<Vec<Wallet>, AppError> {
        let payload: WalletsPayload = self
            .fetch(ApiRequest::get("/wallets"), "Failed to fetch wallets")
            .await?;
        Ok(payload.wallets)
    }

    #[instrument(skip(self))]
    async fn create_wallet(&self, currency: &str) -> Result<Wallet, AppError> {
        if currency.chars().count() != 3 {
            return Err(AppError::Validation(ValidationError::InvalidField {
                field: "currency".to_string(),
                message: "Currency must be a 3-letter code".to_string(),
            }));
        }
        let request = ApiRequest::post("/wallets").json(&CreateWalletBody { currency })?;
        let payload: WalletPayload = self.fetch(request, "Failed to create wallet").await?;
        Ok(payload.wallet)
    }

    #[instrument(skip(self))]
    async fn wallet_balance(&self, wallet_id: &str) -> Result<WalletBalance, AppError> {
        let wallet_id = require_id("walletId", wallet_id)?;
        let payload: BalancePayload = self
            .fetch(
                ApiRequest::get(format!("/wallets/{}/balance", wallet_id)),
                "Failed to fetch wallet balance",
            )
            .await?;
        Ok(payload.balance)
    }

    #[instrument(skip(self))]
    async fn wallet_ledger(
        &self,
        wallet_id: &str,
        query: LedgerQuery,
    ) -> Result<PaginatedResponse<LedgerEntry>, AppError> {
        let wallet_id = require_id("walletId", wallet_id)?;
        let request =
            ApiRequest::get(format!("/wallets/{}/ledger", wallet_id)).query(query.to_query());
        self.fetch(request, "Failed to fetch wallet ledger").await
    }
}
