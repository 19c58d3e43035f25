//! Integration tests for the HTTP dashboard client.
//!
//! Uses `wiremock` to stand in for the Odi Pay backend and checks envelope
//! handling, error message priority, query encoding and the one-shot
//! session refresh.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{TimeZone, Utc};
use secrecy::ExposeSecret;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

use odipay_client::domain::{
    ApiError, AppError, ApplicationStatus, CreateApplicationInput, DashboardApi, LedgerQuery,
    PageRequest, SignInInput, UpdateApplicationInput,
};
use odipay_client::infra::{ApiClientConfig, HttpApiClient};

// ============================================================================
// FIXTURES
// ============================================================================

fn client_for(server: &MockServer) -> HttpApiClient {
    let config = ApiClientConfig::new(format!("{}/api/v1", server.uri())).unwrap();
    HttpApiClient::new(&config).unwrap()
}

fn user_json() -> serde_json::Value {
    json!({
        "id": "usr_1",
        "email": "merchant@odipay.test",
        "name": "Merchant",
        "role": "MERCHANT",
        "emailVerified": true,
        "createdAt": "2024-01-10T08:00:00.000Z"
    })
}

fn application_json(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Checkout",
        "description": null,
        "status": status,
        "webhookUrl": "https://shop.example.com/hooks",
        "rateLimit": 100,
        "createdAt": "2024-01-10T08:00:00.000Z",
        "updatedAt": "2024-01-11T08:00:00.000Z"
    })
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "data": data }))
}

fn applications_page() -> serde_json::Value {
    json!({
        "items": [application_json("app_1", "ACTIVE")],
        "pagination": { "page": 1, "perPage": 20, "total": 1, "totalPages": 1, "hasMore": false }
    })
}

fn counting_handler(client: &HttpApiClient) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    client.set_on_session_lost(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    calls
}

// ============================================================================
// ENVELOPE AND ERROR MESSAGES
// ============================================================================

mod envelope_tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_in_sends_credentials_and_parses_user() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/sign-in"))
            .and(body_json(json!({
                "email": "merchant@odipay.test",
                "password": "hunter22"
            })))
            .respond_with(ok(json!({
                "user": user_json(),
                "session": { "id": "ses_1", "expiresAt": "2024-01-17T08:00:00.000Z" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client
            .sign_in(&SignInInput::new("merchant@odipay.test", "hunter22"))
            .await
            .unwrap();

        assert_eq!(response.user.id, "usr_1");
        assert_eq!(response.session.id, "ses_1");
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_backend() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ok(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .sign_in(&SignInInput::new("not-an-email", "secret"))
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let mut input = CreateApplicationInput::named("Shop");
        input.rate_limit = Some(5);
        let result = client.create_application(&input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        for name in [String::new(), "x".repeat(101)] {
            let result = client
                .create_application(&CreateApplicationInput::named(name))
                .await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_success_false_on_http_200_is_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/wallets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error": { "code": "WALLET_LOCKED", "message": "Wallets are locked" }
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).list_wallets().await;
        match result {
            Err(AppError::Api(ApiError::Envelope(message))) => {
                assert_eq!(message, "Wallets are locked");
            }
            other => panic!("expected envelope error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_data_is_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/wallets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .mount(&server)
            .await;

        let err = client_for(&server).list_wallets().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch wallets");
    }

    #[tokio::test]
    async fn test_error_message_priority() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/applications/app_both"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "error": { "code": "NOT_FOUND", "message": "Application not found" },
                "message": "Request failed"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/applications/app_top"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "message": "Bad application id"
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/applications/app_none"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let client = client_for(&server);

        let err = client.get_application("app_both").await.unwrap_err();
        assert_eq!(err.to_string(), "Application not found");
        assert!(matches!(
            err,
            AppError::Api(ApiError::Status {
                status_code: 404,
                ..
            })
        ));

        let err = client.get_application("app_top").await.unwrap_err();
        assert_eq!(err.to_string(), "Bad application id");

        let err = client.get_application("app_none").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch application");
    }

    #[tokio::test]
    async fn test_empty_body_on_delete_is_success() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/api/v1/applications/app_1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .delete_application("app_1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let config = ApiClientConfig::new(format!("http://{addr}/api/v1")).unwrap();
        let client = HttpApiClient::new(&config).unwrap();

        let result = client.list_wallets().await;
        assert!(matches!(result, Err(AppError::Api(ApiError::Network(_)))));
    }
}

// ============================================================================
// RESOURCE ROUTES
// ============================================================================

mod resource_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_applications_sends_page_params() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/applications"))
            .and(query_param("page", "2"))
            .and(query_param("perPage", "10"))
            .respond_with(ok(applications_page()))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server)
            .list_applications(PageRequest::new(2, 10))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_ledger_dates_use_canonical_timestamps() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/wallets/wal_1/ledger"))
            .and(query_param("page", "1"))
            .and(query_param("perPage", "50"))
            .and(query_param("startDate", "2024-03-01T00:00:00.000Z"))
            .and(query_param("endDate", "2024-03-31T23:59:59.000Z"))
            .respond_with(ok(json!({
                "items": [{
                    "id": "led_1",
                    "type": "CREDIT",
                    "amount": "15000.00",
                    "balanceAfter": "65000.00",
                    "description": "Collection from 256700000001",
                    "transactionId": "txn_1",
                    "createdAt": "2024-03-02T10:15:00.000Z"
                }],
                "pagination": { "page": 1, "perPage": 50, "total": 1, "totalPages": 1, "hasMore": false }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = LedgerQuery::default().between(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap(),
        );
        let page = client_for(&server)
            .wallet_ledger("wal_1", query)
            .await
            .unwrap();

        assert_eq!(page.items[0].entry_type, "CREDIT");
        assert_eq!(page.items[0].balance_after.to_string(), "65000.00");
    }

    #[tokio::test]
    async fn test_create_application_returns_key_once() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/applications"))
            .and(body_json(json!({ "name": "Checkout", "rateLimit": 100 })))
            .respond_with(ok(json!({
                "application": application_json("app_9", "ACTIVE"),
                "apiKey": "odi_live_abc123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut input = CreateApplicationInput::named("Checkout");
        input.rate_limit = Some(100);
        let created = client_for(&server)
            .create_application(&input)
            .await
            .unwrap();

        assert_eq!(created.application.id, "app_9");
        assert_eq!(created.api_key.expose_secret(), "odi_live_abc123");
        assert!(!format!("{:?}", created).contains("odi_live_abc123"));
    }

    #[tokio::test]
    async fn test_update_application_can_clear_webhook() {
        let server = MockServer::start().await;

        Mock::given(method("PATCH"))
            .and(path("/api/v1/applications/app_1"))
            .and(body_json(json!({ "webhookUrl": null })))
            .respond_with(ok(json!({ "application": application_json("app_1", "ACTIVE") })))
            .expect(1)
            .mount(&server)
            .await;

        let input = UpdateApplicationInput {
            webhook_url: Some(None),
            ..Default::default()
        };
        client_for(&server)
            .update_application("app_1", &input)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_suspend_returns_updated_application() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/applications/app_1/suspend"))
            .respond_with(ok(json!({ "application": application_json("app_1", "SUSPENDED") })))
            .expect(1)
            .mount(&server)
            .await;

        let app = client_for(&server)
            .suspend_application("app_1")
            .await
            .unwrap();
        assert_eq!(app.status, ApplicationStatus::Suspended);
    }

    #[tokio::test]
    async fn test_create_wallet_posts_currency() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/wallets"))
            .and(body_json(json!({ "currency": "USD" })))
            .respond_with(ok(json!({
                "wallet": {
                    "id": "wal_usd",
                    "type": "MERCHANT",
                    "currency": "USD",
                    "status": "ACTIVE",
                    "balance": {
                        "walletId": "wal_usd",
                        "currency": "USD",
                        "availableBalance": "0",
                        "pendingBalance": "0",
                        "totalBalance": "0"
                    },
                    "createdAt": "2024-01-10T08:00:00.000Z"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let wallet = client_for(&server).create_wallet("USD").await.unwrap();
        assert_eq!(wallet.currency, "USD");
        assert_eq!(wallet.wallet_type, "MERCHANT");
    }
}

// ============================================================================
// SESSION REFRESH
// ============================================================================

mod refresh_tests {
    use super::*;

    #[tokio::test]
    async fn test_expired_session_refreshes_and_retries_once() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/applications"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "error": { "code": "TOKEN_EXPIRED", "message": "Access token expired" }
            })))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh-tokens"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "access_token=renewed; Path=/; HttpOnly")
                    .set_body_json(json!({ "success": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v1/applications"))
            .and(header("cookie", "access_token=renewed"))
            .respond_with(ok(applications_page()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let lost = counting_handler(&client);

        let page = client
            .list_applications(PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.items[0].id, "app_1");
        assert_eq!(lost.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_reports_session_lost_and_original_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/wallets"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "error": { "code": "TOKEN_EXPIRED", "message": "Access token expired" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh-tokens"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "error": { "code": "REFRESH_EXPIRED", "message": "Refresh token expired" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let lost = counting_handler(&client);

        let err = client.list_wallets().await.unwrap_err();

        assert!(matches!(
            &err,
            AppError::Api(ApiError::Unauthorized(message)) if message == "Access token expired"
        ));
        assert_eq!(lost.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_unauthorized_is_not_refreshed_again() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/auth/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "message": "Unauthorized"
            })))
            .expect(2)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh-tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let lost = counting_handler(&client);

        let err = client.current_user().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(lost.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_auth_endpoints_never_refresh() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/sign-in"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "success": false,
                "error": { "code": "INVALID_CREDENTIALS", "message": "Invalid email or password" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh-tokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let lost = counting_handler(&client);

        let err = client
            .sign_in(&SignInInput::new("merchant@odipay.test", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid email or password");
        assert_eq!(lost.load(Ordering::SeqCst), 0);
    }
}
