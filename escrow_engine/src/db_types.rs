use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use meg_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::fees::FeeBreakdown;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

//--------------------------------------  TransactionStatus  ---------------------------------------------------------
/// The lifecycle state of a sale.
///
/// The happy path is `Pending → PaymentReceived → Shipped → Delivered → Completed`. A dispute can
/// intercept at `Shipped` or `Delivered` and resolves to `Completed` or `Refunded`. `Cancelled` is
/// only reachable before payment. `Completed`, `Refunded` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    PaymentReceived,
    Shipped,
    Delivered,
    Completed,
    Disputed,
    Refunded,
    Cancelled,
}

impl TransactionStatus {
    /// The single source of truth for legal state transitions. Every status update in the storage
    /// layer is additionally guarded by a compare-and-swap on the expected prior status, so
    /// duplicate webhooks and overlapping job runs are rejected rather than applied twice.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, PaymentReceived)
                | (Pending, Cancelled)
                | (PaymentReceived, Shipped)
                | (Shipped, Delivered)
                | (Shipped, Disputed)
                | (Delivered, Completed)
                | (Delivered, Disputed)
                | (Disputed, Completed)
                | (Disputed, Refunded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Refunded | TransactionStatus::Cancelled)
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::PaymentReceived => "PaymentReceived",
            TransactionStatus::Shipped => "Shipped",
            TransactionStatus::Delivered => "Delivered",
            TransactionStatus::Completed => "Completed",
            TransactionStatus::Disputed => "Disputed",
            TransactionStatus::Refunded => "Refunded",
            TransactionStatus::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TransactionStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "PaymentReceived" => Ok(Self::PaymentReceived),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Completed" => Ok(Self::Completed),
            "Disputed" => Ok(Self::Disputed),
            "Refunded" => Ok(Self::Refunded),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid transaction status: {s}"))),
        }
    }
}

//--------------------------------------    DisputeStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DisputeStatus {
    Open,
    ResolvedBuyer,
    ResolvedSeller,
    ResolvedSplit,
}

impl Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DisputeStatus::Open => "Open",
            DisputeStatus::ResolvedBuyer => "ResolvedBuyer",
            DisputeStatus::ResolvedSeller => "ResolvedSeller",
            DisputeStatus::ResolvedSplit => "ResolvedSplit",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------  DisputeResolution  ---------------------------------------------------------
/// The operator's verdict when settling a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisputeResolution {
    /// Full refund of the total charged amount.
    Buyer,
    /// No refund; the dispute is closed in the seller's favour.
    Seller,
    /// Partial refund, bounded to the item price.
    Split,
}

impl FromStr for DisputeResolution {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            "split" => Ok(Self::Split),
            s => Err(ConversionError(format!("Invalid dispute resolution: {s}"))),
        }
    }
}

impl Display for DisputeResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisputeResolution::Buyer => write!(f, "buyer"),
            DisputeResolution::Seller => write!(f, "seller"),
            DisputeResolution::Split => write!(f, "split"),
        }
    }
}

//--------------------------------------      SellerTier     ---------------------------------------------------------
/// Subscription tier of a seller. Drives the platform fee rate and who carries the processor fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SellerTier {
    Free,
    Plus,
    Pro,
}

impl Display for SellerTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SellerTier::Free => write!(f, "Free"),
            SellerTier::Plus => write!(f, "Plus"),
            SellerTier::Pro => write!(f, "Pro"),
        }
    }
}

impl FromStr for SellerTier {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Free" => Ok(Self::Free),
            "Plus" => Ok(Self::Plus),
            "Pro" => Ok(Self::Pro),
            s => Err(ConversionError(format!("Invalid seller tier: {s}"))),
        }
    }
}

//--------------------------------------       Carrier       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    Ups,
    Fedex,
    Usps,
}

impl Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Carrier::Ups => write!(f, "ups"),
            Carrier::Fedex => write!(f, "fedex"),
            Carrier::Usps => write!(f, "usps"),
        }
    }
}

impl FromStr for Carrier {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ups" => Ok(Self::Ups),
            "fedex" => Ok(Self::Fedex),
            "usps" => Ok(Self::Usps),
            s => Err(ConversionError(format!("Unknown carrier: {s}"))),
        }
    }
}

//--------------------------------------    ListingStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ListingStatus {
    Active,
    Sold,
    Removed,
}

impl Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListingStatus::Active => write!(f, "Active"),
            ListingStatus::Sold => write!(f, "Sold"),
            ListingStatus::Removed => write!(f, "Removed"),
        }
    }
}

//--------------------------------------       Listing       ---------------------------------------------------------
/// Listings are owned by an external service. The engine reads price and status at checkout time
/// and flips the status to `Sold` when escrow is released.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub seller_id: String,
    pub price: Money,
    pub status: ListingStatus,
    pub device_type: String,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------     UserProfile     ---------------------------------------------------------
/// The payment-relevant slice of a user record. The connected-account fields are a cache of the
/// processor's authoritative state and are only written by the account synchroniser.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub connected_account_id: Option<String>,
    pub account_status: String,
    pub charges_enabled: bool,
    pub payouts_enabled: bool,
    pub onboarding_complete: bool,
    pub tier: SellerTier,
    pub is_admin: bool,
    pub banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Whether the user can receive funds via a destination transfer. Admin sellers bypass this
    /// check and are paid directly.
    pub fn can_receive_payouts(&self) -> bool {
        self.connected_account_id.is_some() && self.payouts_enabled && self.onboarding_complete
    }
}

//--------------------------------------   ShippingAddress   ---------------------------------------------------------
/// Immutable snapshot of the buyer's shipping address taken at checkout time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
}

//--------------------------------------     Transaction     ---------------------------------------------------------
/// The central entity: one brokered sale, from payment authorization through escrow release.
///
/// The fee breakdown columns are computed once at creation and never rewritten; refunds are
/// recorded in `refunded_amount` instead of mutating the original charge.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub buyer_id: String,
    pub seller_id: String,
    pub listing_id: String,
    pub sale_price: Money,
    pub tax_rate_bps: i64,
    pub tax_amount: Money,
    pub shipping_cost: Money,
    pub platform_fee: Money,
    pub processor_fee: Money,
    pub seller_payout: Money,
    pub total_amount: Money,
    pub payment_intent_id: String,
    /// The processor's own status string, stored verbatim for audit.
    pub payment_status: String,
    pub status: TransactionStatus,
    pub funds_held: bool,
    pub escrow_release_at: Option<DateTime<Utc>>,
    pub dispute_status: Option<DisputeStatus>,
    pub dispute_reason: Option<String>,
    pub refunded_amount: Option<Money>,
    pub tracking_number: Option<String>,
    pub carrier: Option<Carrier>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub ship_to_name: String,
    pub ship_to_line1: String,
    pub ship_to_line2: Option<String>,
    pub ship_to_city: String,
    pub ship_to_postal_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn is_party(&self, user_id: &str) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    pub fn has_open_dispute(&self) -> bool {
        self.dispute_status == Some(DisputeStatus::Open)
    }
}

//--------------------------------------    NewTransaction   ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub buyer_id: String,
    pub seller_id: String,
    pub listing_id: String,
    pub sale_price: Money,
    pub breakdown: FeeBreakdown,
    pub payment_intent_id: String,
    /// Initial processor status string for the authorization.
    pub payment_status: String,
    pub ship_to: ShippingAddress,
}
