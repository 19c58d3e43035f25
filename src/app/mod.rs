//! Application layer: state stores, route guard and session wiring.

pub mod applications_store;
pub mod auth_store;
pub mod route_guard;
pub mod state;
mod store;
pub mod two_factor;
pub mod wallets_store;

pub use applications_store::{ApplicationsState, ApplicationsStore};
pub use auth_store::{AuthState, AuthStore};
pub use route_guard::{GuardDecision, GuardState, RouteGuard, SIGN_IN_PATH};
pub use state::AppState;
pub use two_factor::{CodeVerifier, StaticCodeVerifier, TwoFactorGate};
pub use wallets_store::{WalletsState, WalletsStore};
