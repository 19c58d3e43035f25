//! Domain traits defining contracts for external systems.

use async_trait::async_trait;
use secrecy::SecretString;

use super::error::AppError;
use super::types::{
    Application, AuthResponse, CreateApplicationInput, CreatedApplication, CurrentUser,
    LedgerEntry, LedgerQuery, PageRequest, PaginatedResponse, SignInInput, SignUpInput,
    UpdateApplicationInput, UpdateProfileInput, Wallet, WalletBalance,
};

/// Backend REST API consumed by the dashboard stores.
///
/// Each method maps to exactly one backend route. Implementations validate
/// inputs before sending and carry session credentials themselves.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn sign_up(&self, input: &SignUpInput) -> Result<AuthResponse, AppError>;

    async fn sign_in(&self, input: &SignInInput) -> Result<AuthResponse, AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;

    async fn current_user(&self) -> Result<CurrentUser, AppError>;

    async fn update_profile(&self, input: &UpdateProfileInput) -> Result<CurrentUser, AppError>;

    /// Renew expired session credentials without user interaction
    async fn refresh_session(&self) -> Result<(), AppError>;

    async fn list_applications(
        &self,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Application>, AppError>;

    async fn get_application(&self, id: &str) -> Result<Application, AppError>;

    async fn create_application(
        &self,
        input: &CreateApplicationInput,
    ) -> Result<CreatedApplication, AppError>;

    async fn update_application(
        &self,
        id: &str,
        input: &UpdateApplicationInput,
    ) -> Result<Application, AppError>;

    async fn suspend_application(&self, id: &str) -> Result<Application, AppError>;

    async fn activate_application(&self, id: &str) -> Result<Application, AppError>;

    async fn delete_application(&self, id: &str) -> Result<(), AppError>;

    async fn rotate_api_key(&self, id: &str) -> Result<SecretString, AppError>;

    async fn regenerate_webhook_secret(&self, id: &str) -> Result<SecretString, AppError>;

    async fn list_wallets(&self) -> Result<Vec<Wallet>, AppError>;

    async fn create_wallet(&self, currency: &str) -> Result<Wallet, AppError>;

    async fn wallet_balance(&self, wallet_id: &str) -> Result<WalletBalance, AppError>;

    async fn wallet_ledger(
        &self,
        wallet_id: &str,
        query: LedgerQuery,
    ) -> Result<PaginatedResponse<LedgerEntry>, AppError>;
}

/// Minimal authentication state kept across reloads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedAuth {
    pub is_authenticated: bool,
}

/// Storage for the persisted authentication flag
pub trait AuthPersistence: Send + Sync {
    /// Load the last saved flag, `None` when nothing was saved
    fn load(&self) -> Result<Option<PersistedAuth>, AppError>;

    fn save(&self, state: PersistedAuth) -> Result<(), AppError>;

    fn clear(&self) -> Result<(), AppError>;
}
