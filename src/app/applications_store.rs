//! Merchant applications state.

use std::sync::Arc;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::domain::{
    AppError, Application, CreateApplicationInput, CreatedApplication, DEFAULT_APPLICATIONS_PER_PAGE,
    DashboardApi, PageRequest, Pagination, UpdateApplicationInput,
};

use super::store::{ActionStatus, StoreCell};

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationsState {
    pub applications: Vec<Application>,
    pub current_application: Option<Application>,
    pub pagination: Pagination,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for ApplicationsState {
    fn default() -> Self {
        Self {
            applications: Vec::new(),
            current_application: None,
            pagination: Pagination::first(DEFAULT_APPLICATIONS_PER_PAGE),
            is_loading: false,
            error: None,
        }
    }
}

impl ActionStatus for ApplicationsState {
    fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }
}

impl ApplicationsState {
    /// Swap in the backend's copy of `id`, keeping the current selection in step
    fn replace(&mut self, id: &str, updated: &Application) {
        for app in self.applications.iter_mut().filter(|app| app.id == id) {
            *app = updated.clone();
        }
        if self.current_application.as_ref().is_some_and(|c| c.id == id) {
            self.current_application = Some(updated.clone());
        }
    }

    fn remove(&mut self, id: &str) {
        self.applications.retain(|app| app.id != id);
        if self.current_application.as_ref().is_some_and(|c| c.id == id) {
            self.current_application = None;
        }
    }
}

pub struct ApplicationsStore {
    api: Arc<dyn DashboardApi>,
    cell: StoreCell<ApplicationsState>,
}

impl ApplicationsStore {
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>, shutdown: CancellationToken) -> Self {
        Self {
            api,
            cell: StoreCell::new(ApplicationsState::default(), shutdown),
        }
    }

    pub fn snapshot(&self) -> ApplicationsState {
        self.cell.snapshot()
    }

    pub fn applications(&self) -> Vec<Application> {
        self.cell.read().applications.clone()
    }

    pub fn current_application(&self) -> Option<Application> {
        self.cell.read().current_application.clone()
    }

    pub fn pagination(&self) -> Pagination {
        self.cell.read().pagination
    }

    /// Replace the list and pagination with one page from the backend
    #[instrument(skip(self))]
    pub async fn fetch_applications(&self, page: PageRequest) -> Result<(), AppError> {
        self.cell
            .run(
                "fetch_applications",
                self.api.list_applications(page),
                |s, response| {
                    s.applications = response.items.clone();
                    s.pagination = response.pagination;
                },
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn fetch_application(&self, id: &str) -> Result<(), AppError> {
        self.cell
            .run("fetch_application", self.api.get_application(id), |s, app| {
                s.current_application = Some(app.clone());
            })
            .await?;
        Ok(())
    }

    /// Create an application and prepend it; the API key is returned once
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_application(
        &self,
        input: &CreateApplicationInput,
    ) -> Result<CreatedApplication, AppError> {
        self.cell
            .run(
                "create_application",
                self.api.create_application(input),
                |s, created| s.applications.insert(0, created.application.clone()),
            )
            .await
    }

    #[instrument(skip(self, input))]
    pub async fn update_application(
        &self,
        id: &str,
        input: &UpdateApplicationInput,
    ) -> Result<(), AppError> {
        self.cell
            .run(
                "update_application",
                self.api.update_application(id, input),
                |s, updated| s.replace(id, updated),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn suspend_application(&self, id: &str) -> Result<(), AppError> {
        self.cell
            .run(
                "suspend_application",
                self.api.suspend_application(id),
                |s, updated| s.replace(id, updated),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn activate_application(&self, id: &str) -> Result<(), AppError> {
        self.cell
            .run(
                "activate_application",
                self.api.activate_application(id),
                |s, updated| s.replace(id, updated),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_application(&self, id: &str) -> Result<(), AppError> {
        self.cell
            .run("delete_application", self.api.delete_application(id), |s, _| {
                s.remove(id)
            })
            .await
    }

    #[instrument(skip(self))]
    pub async fn rotate_api_key(&self, id: &str) -> Result<SecretString, AppError> {
        self.cell
            .run("rotate_api_key", self.api.rotate_api_key(id), |_, _| {})
            .await
    }

    #[instrument(skip(self))]
    pub async fn regenerate_webhook_secret(&self, id: &str) -> Result<SecretString, AppError> {
        self.cell
            .run(
                "regenerate_webhook_secret",
                self.api.regenerate_webhook_secret(id),
                |_, _| {},
            )
            .await
    }

    pub fn set_current_application(&self, application: Option<Application>) {
        self.cell.update(|s| s.current_application = application);
    }

    pub fn clear_error(&self) {
        self.cell.clear_error();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApplicationStatus;
    use crate::test_utils::sample_application;

    #[test]
    fn test_replace_updates_list_and_selection() {
        let mut state = ApplicationsState {
            applications: vec![sample_application("a1", "One"), sample_application("a2", "Two")],
            current_application: Some(sample_application("a2", "Two")),
            ..Default::default()
        };

        let mut suspended = sample_application("a2", "Two");
        suspended.status = ApplicationStatus::Suspended;
        state.replace("a2", &suspended);

        assert_eq!(state.applications[1].status, ApplicationStatus::Suspended);
        assert_eq!(state.applications[0].status, ApplicationStatus::Active);
        assert_eq!(
            state.current_application.as_ref().map(|a| a.status),
            Some(ApplicationStatus::Suspended)
        );
    }

    #[test]
    fn test_remove_clears_matching_selection() {
        let mut state = ApplicationsState {
            applications: vec![sample_application("a1", "One")],
            current_application: Some(sample_application("a1", "One")),
            ..Default::default()
        };
        state.remove("a1");
        assert!(state.applications.is_empty());
        assert!(state.current_application.is_none());
    }

    #[test]
    fn test_default_pagination() {
        let state = ApplicationsState::default();
        assert_eq!(state.pagination, Pagination::first(20));
    }
}
