#![allow(dead_code)]

use paysettle::application::orchestrator::{PaymentOrchestrator, PaymentOrchestratorBuilder};
use paysettle::config::OrchestratorConfig;
use paysettle::domain::attempt::AttemptState;
use paysettle::domain::money::{Amount, Country, Currency};
use paysettle::domain::outcome::{AttemptEvent, PollUpdate, ProgressFn};
use paysettle::domain::ports::BrowserSessionRef;
use paysettle::domain::request::PaymentRequest;
use paysettle::domain::token::{CardCredential, Credential};
use paysettle::infrastructure::clock::RecordingSleeper;
use paysettle::infrastructure::scripted::{GatewayScript, Scripted, ScriptedGateway};
use paysettle::infrastructure::wire::{
    AuthenticationSetupBody, ChallengeBody, InitializeResponseBody, StatusResponseBody,
    TokenizeResponseBody,
};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

/// Base64 of `{"messageVersion":"2.1.0"}`.
pub const V2_PAYLOAD: &str = "eyJtZXNzYWdlVmVyc2lvbiI6IjIuMS4wIn0=";

pub fn amount(value: Decimal) -> Amount {
    Amount::new(value).unwrap()
}

pub fn card() -> CardCredential {
    CardCredential {
        number: "4111111111111111".to_string(),
        holder_name: "Ana Souza".to_string(),
        expiry_month: 12,
        expiry_year: 2030,
        cvv: "123".to_string(),
    }
}

pub fn request(value: Decimal, credential: Credential) -> PaymentRequest {
    PaymentRequest::single(
        amount(value),
        Currency::new("BRL").unwrap(),
        Country::new("BR").unwrap(),
        credential,
    )
}

pub fn card_request(value: Decimal) -> PaymentRequest {
    request(value, Credential::Card(card()))
}

pub fn pending() -> Scripted<StatusResponseBody> {
    Scripted::Body(StatusResponseBody::new(false, "0", true))
}

pub fn settled(code: &str) -> Scripted<StatusResponseBody> {
    Scripted::Body(StatusResponseBody::new(true, code, false))
}

pub fn tokenized(token: &str) -> Scripted<TokenizeResponseBody> {
    Scripted::Body(TokenizeResponseBody::success(token))
}

pub fn initialized() -> Scripted<InitializeResponseBody> {
    Scripted::Body(InitializeResponseBody::success("pk-1", "m-1"))
}

pub fn initialized_with_challenge() -> Scripted<InitializeResponseBody> {
    let mut body = InitializeResponseBody::success("pk-1", "m-1");
    body.challenge = Some(ChallengeBody {
        url: Some("https://acs.example/3ds2/challenge".to_string()),
        payload: Some(V2_PAYLOAD.to_string()),
        term_url: None,
        correlation_id: Some("tx-1".to_string()),
    });
    Scripted::Body(body)
}

pub fn setup_body() -> AuthenticationSetupBody {
    AuthenticationSetupBody {
        collection_url: Some("https://collect.example/ddc".to_string()),
        access_token: Some("jwt".to_string()),
        reference_id: Some("ref-1".to_string()),
        transaction_id: Some("tx-1".to_string()),
    }
}

pub fn config() -> OrchestratorConfig {
    OrchestratorConfig::default()
}

/// Collects every progress event for later assertions.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<AttemptEvent>>>,
}

impl EventLog {
    pub fn progress(&self) -> ProgressFn {
        let events = self.events.clone();
        Arc::new(move |event: AttemptEvent| events.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<AttemptEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<AttemptState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                AttemptEvent::StateChanged { state } => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn polls(&self) -> Vec<PollUpdate> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                AttemptEvent::Poll { update } => Some(update),
                _ => None,
            })
            .collect()
    }
}

/// Everything a test needs to drive one attempt against scripted collaborators.
pub struct Harness {
    pub gateway: ScriptedGateway,
    pub sleeper: Arc<RecordingSleeper>,
    pub log: EventLog,
}

impl Harness {
    pub fn new(script: GatewayScript) -> Self {
        Self {
            gateway: ScriptedGateway::new(script),
            sleeper: Arc::new(RecordingSleeper::default()),
            log: EventLog::default(),
        }
    }

    pub fn builder(
        &self,
        config: OrchestratorConfig,
        browser: BrowserSessionRef,
    ) -> PaymentOrchestratorBuilder {
        PaymentOrchestrator::builder(Arc::new(config), Arc::new(self.gateway.clone()), browser)
            .sleeper(self.sleeper.clone())
            .progress(self.log.progress())
    }
}
