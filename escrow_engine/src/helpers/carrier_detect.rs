use std::sync::OnceLock;

use regex::Regex;

use crate::db_types::Carrier;

/// Tracking-number formats, tried in order. UPS numbers start with `1Z`; USPS domestic numbers
/// are 20-26 digits starting with 9x; FedEx numbers are 12 or 15 digits.
fn tracking_formats() -> &'static [(Regex, Carrier)] {
    static FORMATS: OnceLock<[(Regex, Carrier); 3]> = OnceLock::new();
    FORMATS.get_or_init(|| {
        [
            (Regex::new(r"^1Z[0-9A-Z]{16}$").unwrap(), Carrier::Ups),
            (Regex::new(r"^9[2345]\d{18,24}$").unwrap(), Carrier::Usps),
            (Regex::new(r"^\d{12}(\d{3})?$").unwrap(), Carrier::Fedex),
        ]
    })
}

/// Detect the carrier from the tracking-number format. Returns `None` when no format matches, in
/// which case the caller must supply the carrier explicitly.
pub fn detect_carrier(tracking_number: &str) -> Option<Carrier> {
    let tn = tracking_number.trim().to_ascii_uppercase();
    tracking_formats().iter().find(|(re, _)| re.is_match(&tn)).map(|(_, carrier)| *carrier)
}
