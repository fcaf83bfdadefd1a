//! Dispatcher tests against a mocked webhook receiver

use rstest::rstest;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use buildboard::models::{
    AlertChannels, ChannelOutcome, EmailChannel, NotificationCandidate, WebhookChannel,
};
use buildboard::services::NotificationDispatcher;

fn candidate() -> NotificationCandidate {
    NotificationCandidate {
        title: "CI alert: main failures".to_string(),
        message: "svc-ci #42 failure".to_string(),
        target: Some("svc-ci".to_string()),
        run_number: Some(42),
        link: Some("https://ci.example.com/job/svc-ci/42/".to_string()),
    }
}

#[tokio::test]
async fn test_webhook_delivery_with_email_unconfigured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({
            "title": "CI alert: main failures",
            "message": "svc-ci #42 failure"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = NotificationDispatcher::new(None);
    let channels = AlertChannels {
        email: Some(EmailChannel {
            to: vec!["dev@acme.io".to_string()],
        }),
        webhook: Some(WebhookChannel {
            url: format!("{}/hook", server.uri()),
        }),
    };

    let outcome = dispatcher.dispatch(&channels, &candidate()).await;

    // Email is skipped without SMTP config; the webhook still delivers
    assert_eq!(outcome.email, ChannelOutcome::Skipped);
    assert_eq!(outcome.webhook, ChannelOutcome::Delivered);
    assert!(outcome.any_delivered());
}

#[rstest]
#[case(404)]
#[case(500)]
#[case(503)]
#[tokio::test]
async fn test_webhook_rejection_is_a_channel_failure(#[case] status: u16) {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;

    let dispatcher = NotificationDispatcher::new(None);
    let channels = AlertChannels {
        email: None,
        webhook: Some(WebhookChannel {
            url: format!("{}/hook", server.uri()),
        }),
    };

    let outcome = dispatcher.dispatch(&channels, &candidate()).await;
    assert!(matches!(outcome.webhook, ChannelOutcome::Failed(_)));
    assert!(outcome.all_failed());
}

#[tokio::test]
async fn test_send_test_uses_default_title_and_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(body_partial_json(json!({"title": "Test notification"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = NotificationDispatcher::new(None);
    let channels = AlertChannels {
        email: None,
        webhook: Some(WebhookChannel {
            url: format!("{}/hook", server.uri()),
        }),
    };

    let outcome = dispatcher.send_test(&channels, None, None).await;
    assert_eq!(outcome.webhook, ChannelOutcome::Delivered);
}
