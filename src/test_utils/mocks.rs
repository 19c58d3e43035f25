//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use secrecy::SecretString;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    ApiError, AppError, Application, ApplicationStatus, AuthResponse, AuthSession,
    CreateApplicationInput, CreatedApplication, CurrentUser, DashboardApi, LedgerEntry,
    LedgerQuery, PageRequest, PaginatedResponse, Pagination, SignInInput, SignUpInput,
    UpdateApplicationInput, UpdateProfileInput, UserRole, Wallet, WalletBalance,
};

/// Configuration for mock behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub should_fail: bool,
    pub error_message: Option<String>,
}

impl MockConfig {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            should_fail: true,
            error_message: Some(message.into()),
        }
    }
}

/// A fully populated user for fixtures
#[must_use]
pub fn sample_user(id: &str, email: &str) -> CurrentUser {
    CurrentUser {
        id: id.to_string(),
        email: email.to_string(),
        name: Some("Test Merchant".to_string()),
        image: None,
        role: UserRole::Merchant,
        email_verified: true,
        created_at: Utc::now(),
    }
}

/// An active application with the default rate limit
#[must_use]
pub fn sample_application(id: &str, name: &str) -> Application {
    let now = Utc::now();
    Application {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        status: ApplicationStatus::Active,
        webhook_url: None,
        rate_limit: 100,
        created_at: now,
        updated_at: now,
    }
}

fn zero_balance(wallet_id: &str, currency: &str) -> WalletBalance {
    WalletBalance {
        wallet_id: wallet_id.to_string(),
        currency: currency.to_string(),
        available_balance: Decimal::ZERO,
        pending_balance: Decimal::ZERO,
        total_balance: Decimal::ZERO,
    }
}

#[derive(Default)]
struct MockBackend {
    user: Option<CurrentUser>,
    applications: Vec<Application>,
    wallets: Vec<Wallet>,
    ledger: Vec<(String, LedgerEntry)>,
}

/// In-memory dashboard backend for testing
pub struct MockDashboardApi {
    backend: Mutex<MockBackend>,
    config: MockConfig,
    hang_current_user: AtomicBool,
    requests: AtomicUsize,
}

impl MockDashboardApi {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MockConfig::success())
    }

    #[must_use]
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            backend: Mutex::new(MockBackend::default()),
            config,
            hang_current_user: AtomicBool::new(false),
            requests: AtomicUsize::new(0),
        }
    }

    /// Every call fails with an envelope error carrying `message`
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_config(MockConfig::failure(message))
    }

    /// Make `/auth/me` never answer
    pub fn set_hang_current_user(&self, hang: bool) {
        self.hang_current_user.store(hang, Ordering::Relaxed);
    }

    /// Start with a signed-in user
    pub fn sign_in_as(&self, user: CurrentUser) {
        self.backend.lock().unwrap().user = Some(user);
    }

    /// Drop the backend session, as an expired cookie would
    pub fn expire_session(&self) {
        self.backend.lock().unwrap().user = None;
    }

    pub fn seed_application(&self, application: Application) {
        self.backend.lock().unwrap().applications.push(application);
    }

    pub fn seed_wallet(&self, currency: &str) -> Wallet {
        let wallet = Self::new_wallet(currency);
        self.backend.lock().unwrap().wallets.push(wallet.clone());
        wallet
    }

    /// Credit `amount` to a wallet and record the matching ledger entry
    pub fn seed_credit(&self, wallet_id: &str, amount: Decimal) -> LedgerEntry {
        let mut backend = self.backend.lock().unwrap();
        let balance_after = backend
            .wallets
            .iter_mut()
            .find(|w| w.id == wallet_id)
            .map(|w| {
                w.balance.available_balance += amount;
                w.balance.total_balance += amount;
                w.balance.total_balance
            })
            .unwrap_or(amount);
        let entry = LedgerEntry {
            id: Uuid::new_v4().to_string(),
            entry_type: "CREDIT".to_string(),
            amount,
            balance_after,
            description: "Collection".to_string(),
            transaction_id: Some(Uuid::new_v4().to_string()),
            created_at: Utc::now(),
        };
        backend.ledger.push((wallet_id.to_string(), entry.clone()));
        entry
    }

    /// Number of calls that passed validation and reached the backend
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn new_wallet(currency: &str) -> Wallet {
        let id = Uuid::new_v4().to_string();
        Wallet {
            balance: zero_balance(&id, currency),
            id,
            wallet_type: "MERCHANT".to_string(),
            currency: currency.to_string(),
            status: "ACTIVE".to_string(),
            created_at: Utc::now(),
        }
    }

    fn check_should_fail(&self) -> Result<(), AppError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if self.config.should_fail {
            let msg = self
                .config
                .error_message
                .clone()
                .unwrap_or_else(|| "Mock error".to_string());
            return Err(AppError::Api(ApiError::Envelope(msg)));
        }
        Ok(())
    }

    fn require_user(&self) -> Result<CurrentUser, AppError> {
        self.backend
            .lock()
            .unwrap()
            .user
            .clone()
            .ok_or_else(|| AppError::Api(ApiError::Unauthorized("Unauthorized".to_string())))
    }

    fn not_found(what: &str) -> AppError {
        AppError::Api(ApiError::Status {
            status_code: 404,
            message: format!("{what} not found"),
        })
    }

    fn auth_response(user: CurrentUser) -> AuthResponse {
        AuthResponse {
            user,
            session: AuthSession {
                id: Uuid::new_v4().to_string(),
                expires_at: Utc::now() + Duration::days(7),
            },
        }
    }

    fn update_application_with(
        &self,
        id: &str,
        change: impl FnOnce(&mut Application),
    ) -> Result<Application, AppError> {
        let mut backend = self.backend.lock().unwrap();
        let app = backend
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Self::not_found("Application"))?;
        change(app);
        app.updated_at = Utc::now();
        Ok(app.clone())
    }
}

impl Default for MockDashboardApi {
    fn default() -> Self {
        Self::new()
    }
}

fn paginate<T: Clone>(items: &[T], page: u32, per_page: u32) -> PaginatedResponse<T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total = items.len() as u64;
    let total_pages = total.div_ceil(u64::from(per_page)) as u32;
    let start = ((page - 1) * per_page) as usize;
    let slice = items
        .iter()
        .skip(start)
        .take(per_page as usize)
        .cloned()
        .collect();
    PaginatedResponse {
        items: slice,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages,
            has_more: page < total_pages,
        },
    }
}

#[async_trait]
impl DashboardApi for MockDashboardApi {
    async fn sign_up(&self, input: &SignUpInput) -> Result<AuthResponse, AppError> {
        input.validate()?;
        self.check_should_fail()?;
        let mut user = sample_user(&Uuid::new_v4().to_string(), &input.email);
        user.name = input.name.clone();
        user.email_verified = false;
        self.backend.lock().unwrap().user = Some(user.clone());
        Ok(Self::auth_response(user))
    }

    async fn sign_in(&self, input: &SignInInput) -> Result<AuthResponse, AppError> {
        input.validate()?;
        self.check_should_fail()?;
        let user = sample_user(&Uuid::new_v4().to_string(), &input.email);
        self.backend.lock().unwrap().user = Some(user.clone());
        Ok(Self::auth_response(user))
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        self.check_should_fail()?;
        self.backend.lock().unwrap().user = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<CurrentUser, AppError> {
        if self.hang_current_user.load(Ordering::Relaxed) {
            std::future::pending::<()>().await;
        }
        self.check_should_fail()?;
        self.require_user()
    }

    async fn update_profile(&self, input: &UpdateProfileInput) -> Result<CurrentUser, AppError> {
        input.validate()?;
        self.check_should_fail()?;
        let mut backend = self.backend.lock().unwrap();
        let user = backend
            .user
            .as_mut()
            .ok_or_else(|| AppError::Api(ApiError::Unauthorized("Unauthorized".to_string())))?;
        if let Some(name) = &input.name {
            user.name = Some(name.clone());
        }
        if let Some(image) = &input.image {
            user.image = Some(image.clone());
        }
        Ok(user.clone())
    }

    async fn refresh_session(&self) -> Result<(), AppError> {
        self.check_should_fail()?;
        self.require_user().map(|_| ())
    }

    async fn list_applications(
        &self,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Application>, AppError> {
        self.check_should_fail()?;
        let backend = self.backend.lock().unwrap();
        Ok(paginate(&backend.applications, page.page, page.per_page))
    }

    async fn get_application(&self, id: &str) -> Result<Application, AppError> {
        self.check_should_fail()?;
        self.backend
            .lock()
            .unwrap()
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found("Application"))
    }

    async fn create_application(
        &self,
        input: &CreateApplicationInput,
    ) -> Result<CreatedApplication, AppError> {
        input.validate()?;
        self.check_should_fail()?;
        let mut application = sample_application(&Uuid::new_v4().to_string(), &input.name);
        application.description = input.description.clone();
        application.webhook_url = input.webhook_url.clone();
        if let Some(rate_limit) = input.rate_limit {
            application.rate_limit = rate_limit;
        }
        self.backend
            .lock()
            .unwrap()
            .applications
            .insert(0, application.clone());
        Ok(CreatedApplication {
            application,
            api_key: SecretString::from(format!("odi_test_{}", Uuid::new_v4().simple())),
        })
    }

    async fn update_application(
        &self,
        id: &str,
        input: &UpdateApplicationInput,
    ) -> Result<Application, AppError> {
        input.validate()?;
        self.check_should_fail()?;
        self.update_application_with(id, |app| {
            if let Some(name) = &input.name {
                app.name = name.clone();
            }
            if let Some(description) = &input.description {
                app.description = Some(description.clone());
            }
            if let Some(webhook_url) = &input.webhook_url {
                app.webhook_url = webhook_url.clone();
            }
            if let Some(rate_limit) = input.rate_limit {
                app.rate_limit = rate_limit;
            }
        })
    }

    async fn suspend_application(&self, id: &str) -> Result<Application, AppError> {
        self.check_should_fail()?;
        self.update_application_with(id, |app| app.status = ApplicationStatus::Suspended)
    }

    async fn activate_application(&self, id: &str) -> Result<Application, AppError> {
        self.check_should_fail()?;
        self.update_application_with(id, |app| app.status = ApplicationStatus::Active)
    }

    async fn delete_application(&self, id: &str) -> Result<(), AppError> {
        self.check_should_fail()?;
        let mut backend = self.backend.lock().unwrap();
        let before = backend.applications.len();
        backend.applications.retain(|a| a.id != id);
        if backend.applications.len() == before {
            return Err(Self::not_found("Application"));
        }
        Ok(())
    }

    async fn rotate_api_key(&self, id: &str) -> Result<SecretString, AppError> {
        self.get_application(id).await?;
        Ok(SecretString::from(format!("odi_test_{}", Uuid::new_v4().simple())))
    }

    async fn regenerate_webhook_secret(&self, id: &str) -> Result<SecretString, AppError> {
        self.get_application(id).await?;
        Ok(SecretString::from(format!("whsec_{}", Uuid::new_v4().simple())))
    }

    async fn list_wallets(&self) -> Result<Vec<Wallet>, AppError> {
        self.check_should_fail()?;
        Ok(self.backend.lock().unwrap().wallets.clone())
    }

    async fn create_wallet(&self, currency: &str) -> Result<Wallet, AppError> {
        self.check_should_fail()?;
        let wallet = Self::new_wallet(currency);
        self.backend.lock().unwrap().wallets.push(wallet.clone());
        Ok(wallet)
    }

    async fn wallet_balance(&self, wallet_id: &str) -> Result<WalletBalance, AppError> {
        self.check_should_fail()?;
        self.backend
            .lock()
            .unwrap()
            .wallets
            .iter()
            .find(|w| w.id == wallet_id)
            .map(|w| w.balance.clone())
            .ok_or_else(|| Self::not_found("Wallet"))
    }

    async fn wallet_ledger(
        &self,
        wallet_id: &str,
        query: LedgerQuery,
    ) -> Result<PaginatedResponse<LedgerEntry>, AppError> {
        self.check_should_fail()?;
        let backend = self.backend.lock().unwrap();
        let entries: Vec<LedgerEntry> = backend
            .ledger
            .iter()
            .filter(|(id, _)| id == wallet_id)
            .map(|(_, entry)| entry)
            .filter(|entry| query.start_date.is_none_or(|start| entry.created_at >= start))
            .filter(|entry| query.end_date.is_none_or(|end| entry.created_at <= end))
            .cloned()
            .collect();
        Ok(paginate(&entries, query.page, query.per_page))
    }
}
