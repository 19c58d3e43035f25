//! Domain types with validation support.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateUrl};

use super::error::ApiError;

/// Page size used by the applications list when the caller does not pick one
pub const DEFAULT_APPLICATIONS_PER_PAGE: u32 = 20;

/// Page size used by the wallet ledger when the caller does not pick one
pub const DEFAULT_LEDGER_PER_PAGE: u32 = 50;

/// Currency used for new wallets and collections when none is given
pub const DEFAULT_CURRENCY: &str = "UGX";

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// Structured error inside a response envelope
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvelopeError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Uniform `{success, data, error, message}` wrapper returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<EnvelopeError>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Human-readable message: `error.message`, then `message`, then `fallback`.
    pub fn failure_message(&self, fallback: &str) -> String {
        self.error
            .as_ref()
            .and_then(|e| e.message.clone())
            .filter(|m| !m.is_empty())
            .or_else(|| self.message.clone().filter(|m| !m.is_empty()))
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Unwrap the payload, treating `success:false` or a missing `data` as failure
    pub fn into_data(self, fallback: &str) -> Result<T, ApiError> {
        if !self.success {
            return Err(ApiError::Envelope(self.failure_message(fallback)));
        }
        let message = self.failure_message(fallback);
        self.data.ok_or(ApiError::Envelope(message))
    }

    /// Check `success` only, for endpoints that answer without a payload
    pub fn into_unit(self, fallback: &str) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Envelope(self.failure_message(fallback)))
        }
    }
}

// ============================================================================
// PAGINATION
// ============================================================================

/// Cursor metadata describing the last fetched page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_more: bool,
}

impl Pagination {
    /// Empty first page with the given page size
    #[must_use]
    pub fn first(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page,
            total: 0,
            total_pages: 0,
            has_more: false,
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Page selection for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self { page, per_page }
    }

    pub(crate) fn to_query(self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("perPage", self.per_page.to_string()),
        ]
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_APPLICATIONS_PER_PAGE)
    }
}

/// Ledger page selection with an optional date window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerQuery {
    pub page: u32,
    pub per_page: u32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Default for LedgerQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_LEDGER_PER_PAGE,
            start_date: None,
            end_date: None,
        }
    }
}

impl LedgerQuery {
    #[must_use]
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub(crate) fn to_query(self) -> Vec<(&'static str, String)> {
        let mut query = PageRequest::new(self.page, self.per_page).to_query();
        if let Some(start) = self.start_date {
            query.push(("startDate", format_timestamp(&start)));
        }
        if let Some(end) = self.end_date {
            query.push(("endDate", format_timestamp(&end)));
        }
        query
    }
}

/// Canonical wire timestamp: RFC 3339, UTC, millisecond precision, `Z` suffix
#[must_use]
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// USERS AND SESSIONS
// ============================================================================

/// Role assigned to a dashboard user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Merchant,
    Developer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Merchant => "MERCHANT",
            Self::Developer => "DEVELOPER",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Signed-in user as reported by `/auth/me`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub role: UserRole,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Server-side session handle. The credential itself lives in the cookie jar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub id: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub user: CurrentUser,
    pub session: AuthSession,
}

#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct SignUpInput {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SignUpInput {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>, name: Option<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct SignInInput {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl std::fmt::Debug for SignUpInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUpInput")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

impl SignInInput {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for SignInInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInInput")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "Image must be a valid URL"))]
    pub image: Option<String>,
}

// ============================================================================
// APPLICATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[default]
    Active,
    Suspended,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
        }
    }
}

impl std::str::FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            _ => Err(format!("Invalid application status: {}", s)),
        }
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Merchant-owned API integration record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub webhook_url: Option<String>,
    pub rate_limit: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A freshly created application with its one-time API key
#[derive(Debug)]
pub struct CreatedApplication {
    pub application: Application,
    pub api_key: SecretString,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateApplicationInput {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url(message = "Webhook URL must be a valid URL"))]
    pub webhook_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 10, max = 10000, message = "Rate limit must be between 10 and 10000"))]
    pub rate_limit: Option<u32>,
}

impl CreateApplicationInput {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Partial application update. `webhook_url: Some(None)` clears the webhook.
#[derive(Debug, Clone, Default, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_webhook_patch"))]
pub struct UpdateApplicationInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 10, max = 10000, message = "Rate limit must be between 10 and 10000"))]
    pub rate_limit: Option<u32>,
}

fn validate_webhook_patch(
    input: &UpdateApplicationInput,
) -> Result<(), validator::ValidationError> {
    match &input.webhook_url {
        Some(Some(url)) if !url.validate_url() => {
            let mut err = validator::ValidationError::new("url");
            err.message = Some("Webhook URL must be a valid URL".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

// ============================================================================
// WALLETS AND LEDGER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub wallet_id: String,
    pub currency: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub available_balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub pending_balance: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_balance: Decimal,
}

/// Currency-scoped balance holder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: String,
    #[serde(rename = "type")]
    pub wallet_type: String,
    pub currency: String,
    pub status: String,
    pub balance: WalletBalance,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of one balance-affecting event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance_after: Decimal,
    pub description: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// COLLECTIONS
// ============================================================================

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Mobile-money collection request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCollectionInput {
    #[validate(range(min = 1, message = "Amount must be a positive integer"))]
    pub amount: u64,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: String,
    #[validate(length(min = 9, max = 15, message = "Phone number must be 9 to 15 characters"))]
    pub msisdn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 200, message = "Narration must be at most 200 characters"))]
    pub narration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 100, message = "External reference must be at most 100 characters"))]
    pub external_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl InitiateCollectionInput {
    /// Collection in the default currency
    #[must_use]
    pub fn new(amount: u64, msisdn: impl Into<String>) -> Self {
        Self {
            amount,
            currency: default_currency(),
            msisdn: msisdn.into(),
            narration: None,
            external_ref: None,
            metadata: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_sign_up_validation() {
        assert!(SignUpInput::new("a@b.com", "longenough", None).validate().is_ok());
        assert!(SignUpInput::new("a@b.com", "short", None).validate().is_err());
        assert!(SignUpInput::new("not-an-email", "longenough", None).validate().is_err());
    }

    #[test]
    fn test_sign_in_requires_password() {
        assert!(SignInInput::new("a@b.com", "x").validate().is_ok());
        assert!(SignInInput::new("a@b.com", "").validate().is_err());
    }

    #[test]
    fn test_credentials_redacted_in_debug() {
        let sign_up = format!("{:?}", SignUpInput::new("a@b.com", "hunter2222", None));
        assert!(sign_up.contains("a@b.com"));
        assert!(!sign_up.contains("hunter2222"));

        let sign_in = format!("{:?}", SignInInput::new("a@b.com", "hunter2222"));
        assert!(sign_in.contains("[REDACTED]"));
        assert!(!sign_in.contains("hunter2222"));
    }

    #[test]
    fn test_create_application_bounds() {
        assert!(CreateApplicationInput::named("Checkout").validate().is_ok());
        assert!(CreateApplicationInput::named("").validate().is_err());
        assert!(CreateApplicationInput::named("x".repeat(100)).validate().is_ok());
        assert!(CreateApplicationInput::named("x".repeat(101)).validate().is_err());

        let mut input = CreateApplicationInput::named("Checkout");
        input.rate_limit = Some(9);
        assert!(input.validate().is_err());
        input.rate_limit = Some(10_000);
        assert!(input.validate().is_ok());
        input.description = Some("d".repeat(501));
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_create_application_webhook_url() {
        let mut input = CreateApplicationInput::named("Checkout");
        input.webhook_url = Some("https://merchant.example/hooks".to_string());
        assert!(input.validate().is_ok());
        input.webhook_url = Some("not a url".to_string());
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_application_webhook_patch() {
        let clear = UpdateApplicationInput {
            webhook_url: Some(None),
            ..Default::default()
        };
        assert!(clear.validate().is_ok());
        assert_eq!(
            serde_json::to_value(&clear).unwrap(),
            json!({ "webhookUrl": null })
        );

        let bad = UpdateApplicationInput {
            webhook_url: Some(Some("nope".to_string())),
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        assert_eq!(
            serde_json::to_value(UpdateApplicationInput::default()).unwrap(),
            json!({})
        );
    }

    #[test]
    fn test_initiate_collection_defaults_and_bounds() {
        let input: InitiateCollectionInput =
            serde_json::from_value(json!({ "amount": 5000, "msisdn": "256700000001" })).unwrap();
        assert_eq!(input.currency, "UGX");
        assert!(input.validate().is_ok());

        let mut zero = InitiateCollectionInput::new(0, "256700000001");
        assert!(zero.validate().is_err());
        zero.amount = 1;
        zero.msisdn = "12345678".to_string();
        assert!(zero.validate().is_err());

        let mut currency = InitiateCollectionInput::new(100, "256700000001");
        currency.currency = "UGXX".to_string();
        assert!(currency.validate().is_err());
    }

    #[test]
    fn test_envelope_message_priority() {
        let both: Envelope<()> = serde_json::from_value(json!({
            "success": false,
            "error": { "code": "E1", "message": "structured" },
            "message": "generic"
        }))
        .unwrap();
        assert_eq!(both.failure_message("fallback"), "structured");

        let generic: Envelope<()> =
            serde_json::from_value(json!({ "success": false, "message": "generic" })).unwrap();
        assert_eq!(generic.failure_message("fallback"), "generic");

        let bare: Envelope<()> = serde_json::from_value(json!({ "success": false })).unwrap();
        assert_eq!(bare.failure_message("fallback"), "fallback");
    }

    #[test]
    fn test_envelope_missing_data_is_failure() {
        let envelope: Envelope<u32> = serde_json::from_value(json!({ "success": true })).unwrap();
        assert_eq!(
            envelope.into_data("Failed to fetch"),
            Err(ApiError::Envelope("Failed to fetch".to_string()))
        );

        let ok: Envelope<u32> =
            serde_json::from_value(json!({ "success": true, "data": 7 })).unwrap();
        assert_eq!(ok.into_data("unused"), Ok(7));
    }

    #[test]
    fn test_ledger_query_timestamps() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 59).unwrap();
        let query = LedgerQuery::page(2, 25).between(start, end).to_query();

        assert_eq!(
            query,
            vec![
                ("page", "2".to_string()),
                ("perPage", "25".to_string()),
                ("startDate", "2024-01-01T00:00:00.000Z".to_string()),
                ("endDate", "2024-01-31T23:59:59.000Z".to_string()),
            ]
        );
    }

    #[test]
    fn test_wallet_decodes_decimal_strings() {
        let wallet: Wallet = serde_json::from_value(json!({
            "id": "w1",
            "type": "MERCHANT",
            "currency": "UGX",
            "status": "ACTIVE",
            "balance": {
                "walletId": "w1",
                "currency": "UGX",
                "availableBalance": "1500.50",
                "pendingBalance": "0",
                "totalBalance": "1500.50"
            },
            "createdAt": "2024-03-01T10:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(wallet.wallet_type, "MERCHANT");
        assert_eq!(wallet.balance.available_balance, Decimal::new(150050, 2));
    }

    #[test]
    fn test_application_status_parsing() {
        use std::str::FromStr;
        assert_eq!(
            ApplicationStatus::from_str("SUSPENDED").unwrap(),
            ApplicationStatus::Suspended
        );
        assert_eq!(ApplicationStatus::Active.to_string(), "ACTIVE");
        assert!(ApplicationStatus::from_str("paused").is_err());
    }
}
