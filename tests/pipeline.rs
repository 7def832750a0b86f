use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use paywall::{
    AttributeValue, ConfigResponse, Configuration, EventData, IdentityManager, PaywallConfig,
    PresentationError, PresentationInfo, PresentationOutcome, PresentationRequest, Presenter,
    SuppressionReason, TriggerFireEvent, TriggerOutcome, VariantType, DEEP_LINK_EVENT,
};

#[derive(Clone, Default)]
struct TestPresenter {
    requests: Arc<Mutex<Vec<PresentationRequest>>>,
    presented: Arc<Mutex<bool>>,
}

#[async_trait]
impl Presenter for TestPresenter {
    async fn present(&self, request: &PresentationRequest) -> Result<(), PresentationError> {
        self.requests.lock().unwrap().push(request.clone());
        *self.presented.lock().unwrap() = true;
        Ok(())
    }

    async fn dismiss(&self) {
        *self.presented.lock().unwrap() = false;
    }

    async fn is_presented(&self) -> bool {
        *self.presented.lock().unwrap()
    }
}

fn configuration() -> Configuration {
    let response: ConfigResponse =
        serde_json::from_reader(std::fs::File::open("tests/data/config-v1.json").unwrap())
            .unwrap();
    Configuration::from_server_response(response)
}

struct Setup {
    paywall: paywall::Paywall,
    presenter: TestPresenter,
    fired: Arc<Mutex<Vec<TriggerFireEvent>>>,
    warnings: Arc<Mutex<Vec<String>>>,
}

fn setup() -> Setup {
    let presenter = TestPresenter::default();
    let fired = Arc::new(Mutex::new(Vec::new()));
    let warnings = Arc::new(Mutex::new(Vec::new()));

    let identity = Arc::new(IdentityManager::new());
    identity.identify("integration-user");

    let paywall = PaywallConfig::from_api_key("pk_test")
        .identity_provider(identity)
        .presenter(presenter.clone())
        .trigger_logger({
            let fired = fired.clone();
            move |event: TriggerFireEvent| fired.lock().unwrap().push(event)
        })
        .diagnostics({
            let warnings = warnings.clone();
            move |message: &str, _context: &HashMap<String, String>| {
                warnings.lock().unwrap().push(message.to_owned())
            }
        })
        .to_paywall();
    paywall.set_configuration(configuration());

    Setup {
        paywall,
        presenter,
        fired,
        warnings,
    }
}

#[tokio::test(start_paused = true)]
async fn rule_conditions_select_the_experiment() {
    let Setup {
        paywall, presenter, ..
    } = setup();

    let outcome = paywall
        .handle_event(
            EventData::new("feature_locked")
                .with_parameter("feature", "export")
                .with_parameter("app_version", "2.5.1"),
        )
        .await;

    let PresentationOutcome::Presented(request) = outcome else {
        panic!("expected presentation, got {outcome:?}");
    };
    assert_eq!(request.paywall_identifier.as_deref(), Some("export_pro"));
    assert_eq!(request.experiment.as_ref().unwrap().id, "2001");
    assert_eq!(request.user_id, "integration-user");
    assert_eq!(presenter.requests.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn falls_through_to_holdout_rule() {
    let Setup {
        paywall,
        presenter,
        fired,
        ..
    } = setup();

    let outcome = paywall
        .handle_event(
            EventData::new("feature_locked")
                .with_parameter("feature", "export")
                .with_parameter("app_version", AttributeValue::from("2.3.9")),
        )
        .await;

    let PresentationOutcome::Holdout(experiment) = outcome else {
        panic!("expected holdout, got {outcome:?}");
    };
    assert_eq!(experiment.id, "2002");
    assert_eq!(experiment.variant.variant_type, VariantType::Holdout);
    assert!(presenter.requests.lock().unwrap().is_empty());

    let fired = fired.lock().unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].trigger_outcome, TriggerOutcome::TriggerPaywall);
    assert_eq!(fired[0].experiment.as_ref().unwrap().id, "2002");
}

#[tokio::test(start_paused = true)]
async fn second_trigger_is_suppressed_while_presented() {
    let Setup {
        paywall, presenter, ..
    } = setup();

    let first = paywall
        .handle_event(EventData::new("signup_completed"))
        .await;
    let second = paywall
        .handle_event(EventData::new("signup_completed"))
        .await;

    assert!(matches!(first, PresentationOutcome::Presented(_)));
    assert_eq!(
        second,
        PresentationOutcome::Suppressed(SuppressionReason::AlreadyPresented)
    );
    assert_eq!(presenter.requests.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn deep_link_replaces_presented_paywall() {
    let Setup {
        paywall, presenter, ..
    } = setup();

    paywall.present_paywall("promo").await;
    let outcome = paywall.handle_event(EventData::new(DEEP_LINK_EVENT)).await;

    assert!(matches!(outcome, PresentationOutcome::Presented(_)));
    let requests = presenter.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].presentation_info,
        PresentationInfo::FromIdentifier {
            paywall_identifier: "promo".to_owned()
        }
    );
    assert_eq!(
        requests[1].presentation_info.event_name(),
        Some(DEEP_LINK_EVENT)
    );
}

#[tokio::test(start_paused = true)]
async fn reserved_event_reports_a_warning() {
    let Setup {
        paywall,
        presenter,
        warnings,
        fired,
    } = setup();

    let start = tokio::time::Instant::now();
    let outcome = paywall.handle_event(EventData::new("app_launch")).await;

    assert_eq!(outcome, PresentationOutcome::DisallowedEvent);
    assert!(start.elapsed() < Duration::from_millis(200));
    assert_eq!(warnings.lock().unwrap().len(), 1);
    assert!(fired.lock().unwrap().is_empty());
    assert!(presenter.requests.lock().unwrap().is_empty());
}
