use escrow_engine::traits::{
    ConnectedAccountState,
    NewAuthorization,
    PaymentAuthorization,
    PaymentProcessor,
    ProcessorError,
    RefundReceipt,
};
use meg_common::Money;
use stripe_tools::{StripeApi, StripeApiError};

/// The production [`PaymentProcessor`]: Stripe, spoken through [`StripeApi`].
#[derive(Clone)]
pub struct StripeProcessor {
    api: StripeApi,
}

impl StripeProcessor {
    pub fn new(api: StripeApi) -> Self {
        Self { api }
    }
}

fn map_err(e: StripeApiError) -> ProcessorError {
    match e {
        StripeApiError::QueryError { status, message } => ProcessorError::Api(format!("{status}: {message}")),
        StripeApiError::RequestError(m) | StripeApiError::Initialization(m) => ProcessorError::Network(m),
        StripeApiError::JsonError(m) => ProcessorError::InvalidResponse(m),
    }
}

impl PaymentProcessor for StripeProcessor {
    async fn create_authorization(&self, req: NewAuthorization) -> Result<PaymentAuthorization, ProcessorError> {
        let intent = self
            .api
            .create_payment_intent(
                req.amount,
                &req.currency,
                req.destination_account.as_deref(),
                req.application_fee,
                &req.description,
            )
            .await
            .map_err(map_err)?;
        let client_secret = intent
            .client_secret
            .ok_or_else(|| ProcessorError::InvalidResponse("Payment intent came back without a client secret".into()))?;
        Ok(PaymentAuthorization { id: intent.id, client_secret, status: intent.status })
    }

    async fn issue_refund(
        &self,
        payment_intent_id: &str,
        amount: Option<Money>,
        reason: &str,
    ) -> Result<RefundReceipt, ProcessorError> {
        let refund = self.api.create_refund(payment_intent_id, amount, reason).await.map_err(map_err)?;
        Ok(RefundReceipt { id: refund.id, amount: Money::from_cents(refund.amount) })
    }

    async fn fetch_account_state(&self, account_id: &str) -> Result<ConnectedAccountState, ProcessorError> {
        let account = self.api.fetch_account(account_id).await.map_err(map_err)?;
        Ok(ConnectedAccountState {
            status: account.status().to_string(),
            charges_enabled: account.charges_enabled,
            payouts_enabled: account.payouts_enabled,
            onboarding_complete: account.details_submitted,
        })
    }
}
