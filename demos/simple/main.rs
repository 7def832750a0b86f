use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use paywall::{EventData, PaywallConfig, PresentationError, PresentationRequest, Presenter};

/// Prints presentation requests instead of showing a paywall.
#[derive(Default)]
struct ConsolePresenter {
    presented: AtomicBool,
}

#[async_trait]
impl Presenter for ConsolePresenter {
    async fn present(&self, request: &PresentationRequest) -> Result<(), PresentationError> {
        println!("Presenting paywall: {:?}", request.paywall_identifier);
        self.presented.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn dismiss(&self) {
        println!("Dismissing paywall");
        self.presented.store(false, Ordering::SeqCst);
    }

    async fn is_presented(&self) -> bool {
        self.presented.load(Ordering::SeqCst)
    }
}

pub fn main() {
    env_logger::init();

    let api_key = std::env::var("PAYWALL_API_KEY").unwrap();
    let paywall = PaywallConfig::from_api_key(api_key)
        .presenter(ConsolePresenter::default())
        .trigger_logger(|event| {
            println!("Trigger fired: {:?}", event);
        })
        .to_paywall();

    // Start a poller thread to fetch configuration from the server.
    let poller = paywall.start_poller_thread().unwrap();

    // Events handled before configuration arrives wait for it, so this is optional.
    poller.wait_for_configuration().unwrap();

    let runtime = tokio::runtime::Runtime::new().unwrap();
    let outcome = runtime.block_on(
        paywall.handle_event(EventData::new("signup_completed").with_parameter("plan", "free")),
    );

    println!("Outcome: {:?}", outcome);

    poller.shutdown().unwrap();
}
