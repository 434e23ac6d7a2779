use std::sync::Arc;

use escrow_engine::{
    db_types::Carrier,
    traits::{CarrierTracking, TrackingError, TrackingStatus},
};
use log::*;
use reqwest::{Client, StatusCode};

/// A client for the carrier tracking aggregation service.
///
/// The service exposes `GET /v1/track/{tracking_number}?carrier={carrier}` and returns a JSON
/// body matching [`TrackingStatus`]. It is rate limited; the delivery reconciliation job paces
/// its calls rather than hammering it.
#[derive(Clone)]
pub struct TrackingClient {
    base_url: String,
    client: Arc<Client>,
}

impl TrackingClient {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string(), client: Arc::new(Client::new()) }
    }
}

impl CarrierTracking for TrackingClient {
    async fn get_status(&self, tracking_number: &str, carrier: Option<Carrier>) -> Result<TrackingStatus, TrackingError> {
        let url = format!("{}/v1/track/{tracking_number}", self.base_url);
        let mut req = self.client.get(&url);
        if let Some(carrier) = carrier {
            req = req.query(&[("carrier", carrier.to_string())]);
        }
        trace!("Tracking lookup: {url}");
        let response = req.send().await.map_err(|e| TrackingError::Network(e.to_string()))?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(TrackingError::NotFound(tracking_number.to_string())),
            s if s.is_success() => {
                response.json::<TrackingStatus>().await.map_err(|e| TrackingError::InvalidResponse(e.to_string()))
            },
            s => {
                let message = response.text().await.unwrap_or_default();
                Err(TrackingError::InvalidResponse(format!("{s}: {message}")))
            },
        }
    }
}
