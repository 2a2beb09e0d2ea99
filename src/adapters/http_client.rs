//! Webhook HTTP clients.
//!
//! | Client                    | Target  | Transport                        |
//! |---------------------------|---------|----------------------------------|
//! | `EspHttpWebhookClient`    | espidf  | ESP-IDF HTTP client, TLS via CRT bundle |
//! | `SimulatedWebhookClient`  | any     | none; sleeps and reports success |
//!
//! Both run on the webhook worker thread behind
//! [`ThreadedWebhook`](crate::webhook::ThreadedWebhook) and fold every
//! transport error into a [`CallOutcome`].

use std::time::Duration;

use log::info;

use crate::app::ports::WebhookClient;
use crate::webhook::{CallOutcome, FailureReason, WebhookPayload};

// ───────────────────────────────────────────────────────────────
// ESP-IDF client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::EspHttpWebhookClient;

#[cfg(target_os = "espidf")]
mod esp {
    use std::time::Duration;

    use esp_idf_svc::http::Method;
    use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
    use esp_idf_svc::io::Write;
    use esp_idf_svc::sys::{self, EspError};
    use log::{info, warn};

    use crate::app::ports::WebhookClient;
    use crate::webhook::{CallOutcome, FailureReason, WebhookPayload};

    /// POSTs the payload as JSON to the Home Assistant webhook URL.
    pub struct EspHttpWebhookClient {
        url: String,
    }

    impl EspHttpWebhookClient {
        pub fn new(url: String) -> Self {
            info!("Webhook: endpoint {}", url);
            Self { url }
        }

        fn post(&self, body: &str, timeout: Duration) -> Result<u16, EspError> {
            let config = Configuration {
                timeout: Some(timeout),
                crt_bundle_attach: Some(sys::esp_crt_bundle_attach),
                ..Default::default()
            };
            let mut conn = EspHttpConnection::new(&config)?;
            let len = body.len().to_string();
            let headers = [
                ("Content-Type", "application/json"),
                ("Content-Length", len.as_str()),
            ];
            conn.initiate_request(Method::Post, &self.url, &headers)?;
            conn.write_all(body.as_bytes())?;
            conn.initiate_response()?;
            Ok(conn.status())
        }
    }

    fn reason_for(e: &EspError) -> FailureReason {
        let code = e.code();
        if code == sys::ESP_ERR_TIMEOUT as i32 || code == sys::ESP_ERR_HTTP_EAGAIN as i32 {
            FailureReason::Timeout
        } else {
            FailureReason::Connection
        }
    }

    impl WebhookClient for EspHttpWebhookClient {
        fn call(&mut self, payload: &WebhookPayload, timeout: Duration) -> CallOutcome {
            let body = match payload.to_json() {
                Ok(b) => b,
                Err(e) => {
                    warn!("Webhook: payload encode failed: {}", e);
                    return CallOutcome::Failure(FailureReason::Connection);
                }
            };
            match self.post(&body, timeout) {
                Ok(status) => {
                    info!("Webhook: HTTP {}", status);
                    CallOutcome::from_status(status)
                }
                Err(e) => {
                    let reason = reason_for(&e);
                    warn!("Webhook: request failed ({}): {}", e, reason);
                    CallOutcome::Failure(reason)
                }
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulated client
// ───────────────────────────────────────────────────────────────

/// Stand-in for the network: waits `latency`, then succeeds.  A latency
/// beyond the call timeout is reported as a timeout.
#[derive(Debug, Clone)]
pub struct SimulatedWebhookClient {
    latency: Duration,
    calls: u32,
}

impl SimulatedWebhookClient {
    pub fn new(latency: Duration) -> Self {
        Self { latency, calls: 0 }
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl WebhookClient for SimulatedWebhookClient {
    fn call(&mut self, payload: &WebhookPayload, timeout: Duration) -> CallOutcome {
        self.calls = self.calls.wrapping_add(1);
        info!(
            "Webhook(sim): {} (latency {}ms)",
            payload.to_json().unwrap_or_default(),
            self.latency.as_millis()
        );
        if self.latency > timeout {
            std::thread::sleep(timeout);
            return CallOutcome::Failure(FailureReason::Timeout);
        }
        std::thread::sleep(self.latency);
        CallOutcome::Success
    }
}
