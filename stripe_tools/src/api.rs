use std::sync::Arc;

use log::*;
use meg_common::Money;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;

use crate::{
    config::StripeConfig,
    data_objects::{StripeAccount, StripeEvent, StripePaymentIntent, StripeRefund},
    StripeApiError,
};

/// Stripe's API takes form-encoded bodies and returns JSON.
#[derive(Clone)]
pub struct StripeApi {
    config: StripeConfig,
    client: Arc<Client>,
}

impl StripeApi {
    pub fn new(config: StripeConfig) -> Result<Self, StripeApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let val = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.reveal()))
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        headers.insert("Authorization", val);
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StripeApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn webhook_secret(&self) -> &meg_common::Secret<String> {
        &self.config.webhook_secret
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_url)
    }

    async fn query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, StripeApiError> {
        let url = self.url(path);
        trace!("Sending Stripe request: {} {url}", method.as_str());
        let mut req = self.client.request(method, url);
        if !form.is_empty() {
            req = req.form(form);
        }
        let response = req.send().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("Stripe request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| StripeApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| StripeApiError::RequestError(e.to_string()))?;
            Err(StripeApiError::QueryError { status, message })
        }
    }

    /// Create a payment intent. When a destination account is given the charge is a destination
    /// charge: Stripe transfers the remainder to the seller and retains `application_fee` for the
    /// platform.
    pub async fn create_payment_intent(
        &self,
        amount: Money,
        currency: &str,
        destination_account: Option<&str>,
        application_fee: Money,
        description: &str,
    ) -> Result<StripePaymentIntent, StripeApiError> {
        let mut form = vec![
            ("amount", amount.value().to_string()),
            ("currency", currency.to_string()),
            ("description", description.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];
        if let Some(dest) = destination_account {
            form.push(("transfer_data[destination]", dest.to_string()));
            if application_fee.is_positive() {
                form.push(("application_fee_amount", application_fee.value().to_string()));
            }
        }
        debug!("Creating payment intent for {amount}");
        let intent: StripePaymentIntent = self.query(Method::POST, "/payment_intents", &form).await?;
        info!("Created payment intent [{}] with status {}", intent.id, intent.status);
        Ok(intent)
    }

    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<StripePaymentIntent, StripeApiError> {
        let path = format!("/payment_intents/{id}");
        self.query(Method::GET, &path, &[]).await
    }

    /// Refund a charge, partially when `amount` is given, in full otherwise. The operator's
    /// free-text reason goes into metadata; Stripe's own `reason` field only accepts its fixed
    /// vocabulary.
    pub async fn create_refund(
        &self,
        payment_intent_id: &str,
        amount: Option<Money>,
        reason: &str,
    ) -> Result<StripeRefund, StripeApiError> {
        let mut form = vec![
            ("payment_intent", payment_intent_id.to_string()),
            ("reverse_transfer", "true".to_string()),
            ("refund_application_fee", "true".to_string()),
            ("metadata[reason]", reason.to_string()),
        ];
        if let Some(amount) = amount {
            form.push(("amount", amount.value().to_string()));
        }
        debug!("Refunding payment intent [{payment_intent_id}]");
        let refund: StripeRefund = self.query(Method::POST, "/refunds", &form).await?;
        info!("Refund [{}] created with status {}", refund.id, refund.status);
        Ok(refund)
    }

    pub async fn fetch_account(&self, account_id: &str) -> Result<StripeAccount, StripeApiError> {
        let path = format!("/accounts/{account_id}");
        self.query(Method::GET, &path, &[]).await
    }

    /// Re-fetch a full event by id. Thin webhook payloads carry only a pointer; this returns the
    /// rest.
    pub async fn fetch_event(&self, event_id: &str) -> Result<StripeEvent, StripeApiError> {
        let path = format!("/events/{event_id}");
        self.query(Method::GET, &path, &[]).await
    }
}
