use std::sync::Arc;

use log::*;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::RazorpayConfig,
    data_objects::{NewRazorpayOrder, RazorpayOrder},
    RazorpayApiError,
};

#[derive(Clone)]
pub struct RazorpayApi {
    config: RazorpayConfig,
    client: Arc<Client>,
}

impl RazorpayApi {
    pub fn new(config: RazorpayConfig) -> Result<Self, RazorpayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| RazorpayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// The publishable key id. Safe to hand out to browsers.
    pub fn key_id(&self) -> &str {
        self.config.key_id.as_str()
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, RazorpayApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {method} {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| RazorpayApiError::RestRequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| RazorpayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| RazorpayApiError::RestResponseError(e.to_string()))?;
            Err(RazorpayApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url)
    }

    /// Creates a gateway order. The customer pays against the returned order id in the checkout widget.
    pub async fn create_order(&self, order: NewRazorpayOrder) -> Result<RazorpayOrder, RazorpayApiError> {
        if order.amount <= 0 {
            return Err(RazorpayApiError::InvalidAmount(format!("{} is not a positive amount", order.amount)));
        }
        debug!("Creating Razorpay order for {} {} ({})", order.amount, order.currency, order.receipt);
        let result = self.rest_query::<RazorpayOrder, _>(Method::POST, "/orders", Some(order)).await?;
        info!("Razorpay order {} created for {} {}", result.id, result.amount, result.currency);
        Ok(result)
    }
}

/// Generates a receipt reference for a new gateway order, of the form `receipt_order_k3j9x2a`.
pub fn random_receipt_id() -> String {
    let suffix: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(7).map(|c| char::from(c).to_ascii_lowercase()).collect();
    format!("receipt_order_{suffix}")
}
