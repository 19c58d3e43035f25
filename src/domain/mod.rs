//! Domain layer containing core types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ApiError, AppError, ConfigError, ValidationError};
pub use traits::{AuthPersistence, DashboardApi, PersistedAuth};
pub use types::{
    Application, ApplicationStatus, AuthResponse, AuthSession, CreateApplicationInput,
    CreatedApplication, CurrentUser, DEFAULT_APPLICATIONS_PER_PAGE, DEFAULT_CURRENCY,
    DEFAULT_LEDGER_PER_PAGE, Envelope, EnvelopeError, InitiateCollectionInput, LedgerEntry,
    LedgerQuery, PageRequest, PaginatedResponse, Pagination, SignInInput, SignUpInput,
    UpdateApplicationInput, UpdateProfileInput, UserRole, Wallet, WalletBalance,
    format_timestamp,
};
