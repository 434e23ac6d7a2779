use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use escrow_engine::{AccountSyncError, CheckoutError, DisputeError, FlowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Checkout failed. {0}")]
    Checkout(#[from] CheckoutError),
    #[error("{0}")]
    Flow(#[from] FlowError),
    #[error("{0}")]
    Dispute(#[from] DisputeError),
    #[error("{0}")]
    AccountSync(#[from] AccountSyncError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Checkout(e) => match e {
                CheckoutError::UnknownBuyer(_) | CheckoutError::ListingNotFound(_) | CheckoutError::UnknownSeller(_) => {
                    StatusCode::NOT_FOUND
                },
                CheckoutError::BuyerBanned(_) | CheckoutError::SelfPurchase => StatusCode::FORBIDDEN,
                CheckoutError::MissingPostalCode => StatusCode::BAD_REQUEST,
                // The listing changed under the buyer's feet.
                CheckoutError::ListingNotActive(_) | CheckoutError::PriceChanged { .. } => StatusCode::CONFLICT,
                CheckoutError::SellerNotPayable(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::Processor(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Flow(e) => match e {
                FlowError::TransactionNotFound(_) | FlowError::PaymentIntentNotFound(_) => StatusCode::NOT_FOUND,
                FlowError::NotSeller | FlowError::NotParty => StatusCode::FORBIDDEN,
                FlowError::UnknownCarrier(_) => StatusCode::BAD_REQUEST,
                FlowError::WrongStatus { .. } => StatusCode::CONFLICT,
                FlowError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Dispute(e) => match e {
                DisputeError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
                DisputeError::NotDisputed(_) | DisputeError::ResolutionRaced(_) => StatusCode::CONFLICT,
                DisputeError::MissingSplitAmount | DisputeError::InvalidSplitAmount { .. } => StatusCode::BAD_REQUEST,
                DisputeError::RefundFailed(_) => StatusCode::BAD_GATEWAY,
                DisputeError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::AccountSync(e) => match e {
                AccountSyncError::UnknownAccount(_) => StatusCode::NOT_FOUND,
                AccountSyncError::Processor(_) => StatusCode::BAD_GATEWAY,
                AccountSyncError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No access token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
}
