use std::time::Duration;

use bb_common::{helpers::env_or_default, Secret};
use log::*;

pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    /// The public key id, e.g. `rzp_test_XXXXXXXXXXXX`. This is also handed out to the checkout widget.
    pub key_id: String,
    /// The key secret. Used for basic auth against the API, and for signing checkout callbacks.
    pub key_secret: Secret<String>,
    /// Base URL of the API. Only overridden in tests.
    pub api_url: String,
    /// Upper bound on a whole API request, from connecting until the response body has been read.
    pub timeout: Duration,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self::new("", Secret::default())
    }
}

impl RazorpayConfig {
    pub fn new(key_id: &str, key_secret: Secret<String>) -> Self {
        Self {
            key_id: key_id.to_string(),
            key_secret,
            api_url: DEFAULT_RAZORPAY_API_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn new_from_env_or_default() -> Self {
        let key_id = std::env::var("BB_RAZORPAY_KEY_ID").unwrap_or_else(|_| {
            warn!("BB_RAZORPAY_KEY_ID not set, using (probably useless) default");
            "rzp_test_00000000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("BB_RAZORPAY_KEY_SECRET").unwrap_or_else(|_| {
            error!("BB_RAZORPAY_KEY_SECRET not set. Gateway calls and payment verification will fail.");
            String::default()
        }));
        let api_url = std::env::var("BB_RAZORPAY_API_URL").unwrap_or_else(|_| DEFAULT_RAZORPAY_API_URL.to_string());
        let timeout = Duration::from_millis(env_or_default("BB_RAZORPAY_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS));
        Self::new(&key_id, key_secret).with_api_url(&api_url).with_timeout(timeout)
    }
}
