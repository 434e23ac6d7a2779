mod carrier_detect;

pub use carrier_detect::detect_carrier;
