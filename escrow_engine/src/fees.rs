//! Fee and pricing calculation.
//!
//! Everything in this module is pure and deterministic. All money values are rounded to the cent
//! at each computation step, because the payment processor deals in integer cents; rounding only
//! at the end would drift from the processor's own arithmetic during reconciliation.

use meg_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::SellerTier;

/// Default platform fee for Free-tier sellers: 1%.
pub const DEFAULT_PLATFORM_FEE_BPS_FREE: u32 = 100;
/// Default processor fee: 2.9% of the total charge plus 30c.
pub const DEFAULT_PROCESSOR_FEE_BPS: u32 = 290;
pub const DEFAULT_PROCESSOR_FEE_FIXED_CENTS: i64 = 30;
/// Orders at or above this sale price ship free by default.
pub const DEFAULT_FREE_SHIPPING_THRESHOLD_DOLLARS: i64 = 500;
/// Fallback sales tax when the buyer's postal code has no table entry: 6%.
pub const DEFAULT_TAX_RATE_BPS: u32 = 600;

//--------------------------------------    FeeSchedule      ---------------------------------------------------------
/// Fee rates per seller tier, plus the processor's pricing.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    /// Platform fee charged to Free-tier sellers, in basis points of the sale price.
    pub platform_fee_bps_free: u32,
    /// Plus and Pro tiers pay no platform fee.
    pub platform_fee_bps_plus: u32,
    pub platform_fee_bps_pro: u32,
    /// Processor percentage, applied to the total charged to the buyer.
    pub processor_fee_bps: u32,
    /// Processor fixed fee per charge.
    pub processor_fee_fixed: Money,
    pub free_shipping_threshold: Money,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_fee_bps_free: DEFAULT_PLATFORM_FEE_BPS_FREE,
            platform_fee_bps_plus: 0,
            platform_fee_bps_pro: 0,
            processor_fee_bps: DEFAULT_PROCESSOR_FEE_BPS,
            processor_fee_fixed: Money::from_cents(DEFAULT_PROCESSOR_FEE_FIXED_CENTS),
            free_shipping_threshold: Money::from_dollars(DEFAULT_FREE_SHIPPING_THRESHOLD_DOLLARS),
        }
    }
}

impl FeeSchedule {
    pub fn platform_fee_bps(&self, tier: SellerTier) -> u32 {
        match tier {
            SellerTier::Free => self.platform_fee_bps_free,
            SellerTier::Plus => self.platform_fee_bps_plus,
            SellerTier::Pro => self.platform_fee_bps_pro,
        }
    }

    /// Whether the processor fee is passed through to the seller. Pro sellers have it absorbed by
    /// the platform.
    pub fn seller_pays_processor_fee(&self, tier: SellerTier) -> bool {
        !matches!(tier, SellerTier::Pro)
    }
}

//--------------------------------------     RateTables      ---------------------------------------------------------
/// Tax and shipping rate lookups. These stand in for external rate collaborators; the tables are
/// injected from configuration so an operator can swap them without touching the calculator.
#[derive(Debug, Clone)]
pub struct RateTables {
    /// Postal-code prefix to tax rate in basis points. Longest matching prefix wins.
    tax_rates: Vec<(String, u32)>,
    default_tax_rate_bps: u32,
    /// Device type to flat shipping cost.
    shipping_costs: Vec<(String, Money)>,
    default_shipping_cost: Money,
}

impl Default for RateTables {
    fn default() -> Self {
        Self {
            tax_rates: vec![
                ("900".to_string(), 950),  // CA metro
                ("100".to_string(), 875),  // NY metro
                ("33".to_string(), 700),   // FL
                ("97".to_string(), 0),     // OR, no sales tax
            ],
            default_tax_rate_bps: DEFAULT_TAX_RATE_BPS,
            shipping_costs: vec![
                ("phone".to_string(), Money::from_cents(999)),
                ("tablet".to_string(), Money::from_cents(1499)),
                ("laptop".to_string(), Money::from_cents(2499)),
                ("desktop".to_string(), Money::from_cents(3999)),
            ],
            default_shipping_cost: Money::from_cents(1499),
        }
    }
}

impl RateTables {
    pub fn new(
        tax_rates: Vec<(String, u32)>,
        default_tax_rate_bps: u32,
        shipping_costs: Vec<(String, Money)>,
        default_shipping_cost: Money,
    ) -> Self {
        Self { tax_rates, default_tax_rate_bps, shipping_costs, default_shipping_cost }
    }

    pub fn tax_rate_bps(&self, postal_code: &str) -> u32 {
        self.tax_rates
            .iter()
            .filter(|(prefix, _)| postal_code.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, bps)| *bps)
            .unwrap_or(self.default_tax_rate_bps)
    }

    pub fn shipping_cost(&self, device_type: &str) -> Money {
        self.shipping_costs
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(device_type))
            .map(|(_, cost)| *cost)
            .unwrap_or(self.default_shipping_cost)
    }
}

//--------------------------------------    FeeBreakdown     ---------------------------------------------------------
/// The full pricing breakdown for one sale. Persisted onto the transaction at creation and frozen
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub tax_rate_bps: u32,
    pub tax_amount: Money,
    pub shipping_cost: Money,
    pub free_shipping: bool,
    pub platform_fee_bps: u32,
    pub platform_fee: Money,
    /// Processor fee charged to the seller. Zero for Pro tier (the platform absorbs it).
    pub processor_fee: Money,
    pub seller_payout: Money,
    /// The fee the platform retains on the destination charge. Equal to the platform fee for
    /// Free/Plus tiers and zero for Pro.
    pub application_fee: Money,
    pub total_amount: Money,
}

//--------------------------------------   FeeCalculator     ---------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct FeeCalculator {
    schedule: FeeSchedule,
    rates: RateTables,
}

impl FeeCalculator {
    pub fn new(schedule: FeeSchedule, rates: RateTables) -> Self {
        Self { schedule, rates }
    }

    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    pub fn qualifies_for_free_shipping(&self, sale_price: Money) -> bool {
        sale_price >= self.schedule.free_shipping_threshold
    }

    /// Compute the complete fee breakdown for a sale.
    ///
    /// Guarantees, for all inputs:
    /// * `total_amount == sale_price + tax_amount + shipping_cost`
    /// * `platform_fee + processor_fee + seller_payout == sale_price`
    /// * every value is an exact number of cents
    pub fn quote(&self, sale_price: Money, postal_code: &str, device_type: &str, tier: SellerTier) -> FeeBreakdown {
        let tax_rate_bps = self.rates.tax_rate_bps(postal_code);
        let tax_amount = sale_price.bps(tax_rate_bps);
        let free_shipping = self.qualifies_for_free_shipping(sale_price);
        let shipping_cost = if free_shipping { Money::ZERO } else { self.rates.shipping_cost(device_type) };
        let total_amount = sale_price + tax_amount + shipping_cost;

        let platform_fee_bps = self.schedule.platform_fee_bps(tier);
        let platform_fee = sale_price.bps(platform_fee_bps);
        let processor_fee = if self.schedule.seller_pays_processor_fee(tier) {
            total_amount.bps(self.schedule.processor_fee_bps) + self.schedule.processor_fee_fixed
        } else {
            Money::ZERO
        };
        let seller_payout = sale_price - platform_fee - processor_fee;
        let application_fee = match tier {
            SellerTier::Free | SellerTier::Plus => platform_fee,
            SellerTier::Pro => Money::ZERO,
        };

        FeeBreakdown {
            tax_rate_bps,
            tax_amount,
            shipping_cost,
            free_shipping,
            platform_fee_bps,
            platform_fee,
            processor_fee,
            seller_payout,
            application_fee,
            total_amount,
        }
    }
}
