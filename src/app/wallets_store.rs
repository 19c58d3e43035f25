//! Wallet and ledger state.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::domain::{
    AppError, DEFAULT_CURRENCY, DEFAULT_LEDGER_PER_PAGE, DashboardApi, LedgerEntry, LedgerQuery,
    Pagination, Wallet, WalletBalance,
};

use super::store::{ActionStatus, StoreCell};

#[derive(Debug, Clone, PartialEq)]
pub struct WalletsState {
    pub wallets: Vec<Wallet>,
    pub current_wallet: Option<Wallet>,
    pub ledger_entries: Vec<LedgerEntry>,
    pub ledger_pagination: Pagination,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for WalletsState {
    fn default() -> Self {
        Self {
            wallets: Vec::new(),
            current_wallet: None,
            ledger_entries: Vec::new(),
            ledger_pagination: Pagination::first(DEFAULT_LEDGER_PER_PAGE),
            is_loading: false,
            error: None,
        }
    }
}

impl ActionStatus for WalletsState {
    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

pub struct WalletsStore {
    api: Arc<dyn DashboardApi>,
    cell: StoreCell<WalletsState>,
}

impl WalletsStore {
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>, shutdown: CancellationToken) -> Self {
        Self {
            api,
            cell: StoreCell::new(WalletsState::default(), shutdown),
        }
    }

    pub fn snapshot(&self) -> WalletsState {
        self.cell.snapshot()
    }

    pub fn wallets(&self) -> Vec<Wallet> {
        self.cell.read().wallets.clone()
    }

    pub fn current_wallet(&self) -> Option<Wallet> {
        self.cell.read().current_wallet.clone()
    }

    pub fn ledger_entries(&self) -> Vec<LedgerEntry> {
        self.cell.read().ledger_entries.clone()
    }

    pub fn ledger_pagination(&self) -> Pagination {
        self.cell.read().ledger_pagination
    }

    /// Replace the wallet list; selects the first wallet if none is current
    #[instrument(skip(self))]
    pub async fn fetch_wallets(&self) -> Result<(), AppError> {
        self.cell
            .run("fetch_wallets", self.api.list_wallets(), |s, wallets| {
                s.wallets = wallets.clone();
                if s.current_wallet.is_none() {
                    s.current_wallet = wallets.first().cloned();
                }
            })
            .await?;
        Ok(())
    }

    /// Create a wallet (default currency `UGX`) and append it
    #[instrument(skip(self))]
    pub async fn create_wallet(&self, currency: Option<&str>) -> Result<Wallet, AppError> {
        let currency = currency.unwrap_or(DEFAULT_CURRENCY);
        self.cell
            .run("create_wallet", self.api.create_wallet(currency), |s, wallet| {
                s.wallets.push(wallet.clone());
                if s.current_wallet.is_none() {
                    s.current_wallet = Some(wallet.clone());
                }
            })
            .await
    }

    pub fn set_current_wallet(&self, wallet: Option<Wallet>) {
        self.cell.update(|s| s.current_wallet = wallet);
    }

    /// Refresh one wallet's balance in place
    #[instrument(skip(self))]
    pub async fn fetch_wallet_balance(&self, wallet_id: &str) -> Result<WalletBalance, AppError> {
        self.cell
            .run(
                "fetch_wallet_balance",
                self.api.wallet_balance(wallet_id),
                |s, balance| {
                    for wallet in s.wallets.iter_mut().filter(|w| w.id == wallet_id) {
                        wallet.balance = balance.clone();
                    }
                    if let Some(current) = s.current_wallet.as_mut().filter(|w| w.id == wallet_id) {
                        current.balance = balance.clone();
                    }
                },
            )
            .await
    }

    /// Replace the ledger slice and its pagination with one page
    #[instrument(skip(self))]
    pub async fn fetch_wallet_ledger(
        &self,
        wallet_id: &str,
        query: LedgerQuery,
    ) -> Result<(), AppError> {
        self.cell
            .run(
                "fetch_wallet_ledger",
                self.api.wallet_ledger(wallet_id, query),
                |s, page| {
                    s.ledger_entries = page.items.clone();
                    s.ledger_pagination = page.pagination;
                },
            )
            .await?;
        Ok(())
    }

    pub fn clear_error(&self) {
        self.cell.clear_error();
    }
}
