//! Accounting thresholds and rates.
//!
//! All values are in accounting units, the protocol's abstract measure of
//! work. Defaults match the reference network parameters so nodes
//! interoperate out of the box.

/// Default payment threshold in accounting units.
///
/// When the expected debt towards a peer reaches this level, settlement is
/// triggered proactively.
pub const DEFAULT_PAYMENT_THRESHOLD: u64 = 13_500_000;

/// Default payment tolerance as a percentage.
///
/// Adds a buffer above the payment threshold before a peer is disconnected,
/// absorbing settlement races.
pub const DEFAULT_PAYMENT_TOLERANCE_PERCENT: u64 = 25;

/// Default early payment percentage.
///
/// Settlement is triggered once expected debt reaches
/// `(100 - early)%` of the payment threshold.
pub const DEFAULT_EARLY_PAYMENT_PERCENT: u64 = 50;

/// Default refresh rate in accounting units per second.
///
/// The rate at which time-based refreshment can settle debt with a peer.
pub const DEFAULT_REFRESH_RATE: u64 = 4_500_000;

/// Light node scaling factor.
///
/// Light nodes have threshold and refresh rate divided by this factor,
/// making them more sensitive to bandwidth usage.
pub const DEFAULT_LIGHT_FACTOR: u64 = 10;

/// Default refresh rate for light nodes in accounting units per second.
pub const DEFAULT_LIGHT_REFRESH_RATE: u64 = DEFAULT_REFRESH_RATE / DEFAULT_LIGHT_FACTOR;

/// Thresholds and rates for the accounting core.
#[derive(Debug, Clone)]
pub struct AccountingConfig {
    /// Payment threshold in accounting units.
    pub payment_threshold: u64,
    /// Payment tolerance as a percentage (0-100).
    ///
    /// Disconnect threshold = payment_threshold * (100 + tolerance) / 100.
    pub payment_tolerance_percent: u64,
    /// Early payment percentage (0-100).
    ///
    /// Settlement triggers at payment_threshold * (100 - early) / 100.
    pub early_payment_percent: u64,
    /// Refresh rate in accounting units per second.
    pub refresh_rate: u64,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            payment_threshold: DEFAULT_PAYMENT_THRESHOLD,
            payment_tolerance_percent: DEFAULT_PAYMENT_TOLERANCE_PERCENT,
            early_payment_percent: DEFAULT_EARLY_PAYMENT_PERCENT,
            refresh_rate: DEFAULT_REFRESH_RATE,
        }
    }
}

impl AccountingConfig {
    /// Create a configuration for light nodes.
    ///
    /// Threshold and refresh rate are divided by the light factor.
    pub fn light_node() -> Self {
        let full = Self::default();
        Self {
            payment_threshold: full.payment_threshold / DEFAULT_LIGHT_FACTOR,
            refresh_rate: full.refresh_rate / DEFAULT_LIGHT_FACTOR,
            ..full
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AccountingConfig::default();
        assert_eq!(config.payment_threshold, DEFAULT_PAYMENT_THRESHOLD);
        assert_eq!(config.refresh_rate, DEFAULT_REFRESH_RATE);
    }

    #[test]
    fn test_light_node_config() {
        let config = AccountingConfig::light_node();
        assert_eq!(
            config.payment_threshold,
            DEFAULT_PAYMENT_THRESHOLD / DEFAULT_LIGHT_FACTOR
        );
        assert_eq!(config.refresh_rate, DEFAULT_LIGHT_REFRESH_RATE);
        assert_eq!(
            config.payment_tolerance_percent,
            DEFAULT_PAYMENT_TOLERANCE_PERCENT
        );
    }
}
