//! # Shipping Rate Engine
//!
//! Maps (destination country, checkout currency, cart total) to a shipping
//! cost in minor units. Rules are keyed by country, store their cost and
//! free-shipping threshold in the rule's native currency, and are converted
//! to the checkout currency at evaluation time, never ahead of it.
//!
//! The table is immutable injected configuration: a built-in default
//! mirrors the store's shipping zones, and deployments may override it with
//! a TOML file loaded once at startup.

use crate::error::{BridgeError, BridgeResult};
use crate::money::{convert_minor, Currency, REFERENCE_CURRENCY};
use serde::Deserialize;
use std::collections::HashMap;

/// Per-country shipping policy.
///
/// `cost_minor` and `free_threshold_minor` are always expressed in
/// `native_currency`; conversion happens in [`ShippingTable::calculate`].
#[derive(Debug, Clone)]
pub struct ShippingRule {
    /// Zone label, e.g. "EUROPE", "ROW"
    pub zone: String,
    /// Currency the cost and threshold are denominated in
    pub native_currency: Currency,
    /// Flat shipping cost in native minor units
    pub cost_minor: i64,
    /// Cart total (checkout currency) at or above which shipping is free,
    /// in native minor units
    pub free_threshold_minor: i64,
}

impl ShippingRule {
    pub fn new(
        zone: impl Into<String>,
        native_currency: Currency,
        cost_minor: i64,
        free_threshold_minor: i64,
    ) -> Self {
        Self {
            zone: zone.into(),
            native_currency,
            cost_minor,
            free_threshold_minor,
        }
    }

    /// A degenerate rule (cost 0, threshold 0) is always free and must
    /// short-circuit before any conversion or threshold comparison.
    pub fn is_always_free(&self) -> bool {
        self.cost_minor == 0 && self.free_threshold_minor == 0
    }
}

/// Immutable country → rule table with a rest-of-world default.
#[derive(Debug, Clone)]
pub struct ShippingTable {
    rules: HashMap<String, ShippingRule>,
    default_rule: ShippingRule,
}

impl ShippingTable {
    pub fn new(rules: HashMap<String, ShippingRule>, default_rule: ShippingRule) -> Self {
        Self {
            rules,
            default_rule,
        }
    }

    /// The store's shipping zones: UAE and Oman ship free, the Gulf, UK,
    /// Europe and USA each carry a flat USD rate, everything else falls to
    /// the rest-of-world rate. Free above 230.00 USD everywhere.
    pub fn builtin() -> Self {
        let mut rules = HashMap::new();

        rules.insert(
            "AE".to_string(),
            ShippingRule::new("UAE", Currency::AED, 0, 0),
        );
        rules.insert(
            "OM".to_string(),
            ShippingRule::new("OMAN", Currency::OMR, 0, 0),
        );

        for country in ["SA", "KW", "BH", "QA"] {
            rules.insert(
                country.to_string(),
                ShippingRule::new("MIDDLE_EAST", Currency::USD, 3400, 23000),
            );
        }

        rules.insert(
            "GB".to_string(),
            ShippingRule::new("UK", Currency::USD, 2500, 23000),
        );

        const EUROPE: &[&str] = &[
            "AL", "AD", "AT", "BE", "BA", "BG", "HR", "CY", "CZ", "DK", "EE", "FI", "FR", "DE",
            "GR", "HU", "IS", "IE", "IT", "LV", "LI", "LT", "LU", "MT", "MC", "ME", "NL", "MK",
            "NO", "PL", "PT", "RO", "SM", "RS", "SK", "SI", "ES", "SE", "CH", "VA",
        ];
        for country in EUROPE {
            rules.insert(
                country.to_string(),
                ShippingRule::new("EUROPE", Currency::USD, 1000, 23000),
            );
        }

        rules.insert(
            "US".to_string(),
            ShippingRule::new("USA", Currency::USD, 5000, 23000),
        );

        let default_rule = ShippingRule::new("ROW", Currency::USD, 5000, 23000);

        Self::new(rules, default_rule)
    }

    /// Load an override table from TOML. Unknown currency codes in the file
    /// degrade to the reference currency rather than failing the load.
    pub fn from_toml(toml_str: &str) -> BridgeResult<Self> {
        let raw: RawShippingTable = toml::from_str(toml_str)
            .map_err(|e| BridgeError::Configuration(format!("shipping table: {}", e)))?;

        let default_rule = raw.default.into_rule();
        let rules = raw
            .countries
            .into_iter()
            .map(|(country, rule)| (country.to_uppercase(), rule.into_rule()))
            .collect();

        Ok(Self::new(rules, default_rule))
    }

    /// Rule for a country, falling back to the default rule.
    pub fn rule_for(&self, country_code: &str) -> &ShippingRule {
        self.rules
            .get(&country_code.to_uppercase())
            .unwrap_or(&self.default_rule)
    }

    /// Zone label for a country.
    pub fn zone_for(&self, country_code: &str) -> &str {
        &self.rule_for(country_code).zone
    }

    /// Shipping cost in minor units of the checkout currency.
    ///
    /// Never fails: unknown countries use the default rule, unknown
    /// currency codes evaluate against the reference currency.
    pub fn calculate(
        &self,
        country_code: &str,
        checkout_currency: &str,
        cart_total_minor: i64,
    ) -> i64 {
        let rule = self.rule_for(country_code);

        // Hub countries ship free independent of cart total or currency.
        if rule.is_always_free() {
            return 0;
        }

        let currency = Currency::from_code(checkout_currency).unwrap_or(REFERENCE_CURRENCY);

        // Cost and threshold are converted and rounded independently; the
        // threshold comparison must happen in the checkout currency.
        let converted_cost = convert_minor(rule.cost_minor, rule.native_currency, currency);
        let converted_threshold =
            convert_minor(rule.free_threshold_minor, rule.native_currency, currency);

        if cart_total_minor >= converted_threshold {
            return 0;
        }

        converted_cost
    }
}

impl Default for ShippingTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Deserialize)]
struct RawShippingTable {
    default: RawShippingRule,
    #[serde(default)]
    countries: HashMap<String, RawShippingRule>,
}

#[derive(Debug, Deserialize)]
struct RawShippingRule {
    zone: String,
    currency: String,
    cost: i64,
    threshold: i64,
}

impl RawShippingRule {
    fn into_rule(self) -> ShippingRule {
        let native_currency = Currency::from_code(&self.currency).unwrap_or(REFERENCE_CURRENCY);
        ShippingRule::new(self.zone, native_currency, self.cost, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_countries_always_free() {
        let table = ShippingTable::builtin();

        for country in ["AE", "OM"] {
            for currency in ["USD", "EUR", "KWD", "XYZ"] {
                assert_eq!(table.calculate(country, currency, 0), 0);
                assert_eq!(table.calculate(country, currency, 500), 0);
                assert_eq!(table.calculate(country, currency, 10_000_000), 0);
            }
        }
    }

    #[test]
    fn test_ae_usd_scenario() {
        let table = ShippingTable::builtin();
        assert_eq!(table.calculate("AE", "USD", 500), 0);
    }

    #[test]
    fn test_same_currency_below_threshold() {
        let mut rules = HashMap::new();
        rules.insert(
            "DE".to_string(),
            ShippingRule::new("EUROPE", Currency::EUR, 1000, 10000),
        );
        let table = ShippingTable::new(rules, ShippingRule::new("ROW", Currency::USD, 5000, 23000));

        assert_eq!(table.calculate("DE", "EUR", 5000), 1000);
    }

    #[test]
    fn test_threshold_boundary_is_exact() {
        let mut rules = HashMap::new();
        rules.insert(
            "DE".to_string(),
            ShippingRule::new("EUROPE", Currency::EUR, 1000, 10000),
        );
        let table = ShippingTable::new(rules, ShippingRule::new("ROW", Currency::USD, 5000, 23000));

        assert_eq!(table.calculate("DE", "EUR", 9999), 1000);
        assert_eq!(table.calculate("DE", "EUR", 10000), 0);
        assert_eq!(table.calculate("DE", "EUR", 10001), 0);
    }

    #[test]
    fn test_cross_currency_conversion() {
        let mut rules = HashMap::new();
        rules.insert(
            "DE".to_string(),
            ShippingRule::new("EUROPE", Currency::EUR, 1000, 10000),
        );
        let table = ShippingTable::new(rules, ShippingRule::new("ROW", Currency::USD, 5000, 23000));

        // 10.00 EUR / 0.92 = 10.87 USD; threshold 100.00 EUR -> 108.70 USD
        assert_eq!(table.calculate("DE", "USD", 5000), 1087);
        assert_eq!(table.calculate("DE", "USD", 10869), 1087);
        assert_eq!(table.calculate("DE", "USD", 10870), 0);
        assert_eq!(table.calculate("DE", "USD", 15000), 0);
    }

    #[test]
    fn test_cost_and_threshold_rounded_independently() {
        let mut rules = HashMap::new();
        rules.insert(
            "KW".to_string(),
            ShippingRule::new("MIDDLE_EAST", Currency::USD, 3400, 23000),
        );
        let table = ShippingTable::new(rules, ShippingRule::new("ROW", Currency::USD, 5000, 23000));

        // 34.00 USD -> 31.28 EUR; 230.00 USD -> 211.60 EUR
        assert_eq!(table.calculate("KW", "EUR", 0), 3128);
        assert_eq!(table.calculate("KW", "EUR", 21159), 3128);
        assert_eq!(table.calculate("KW", "EUR", 21160), 0);
    }

    #[test]
    fn test_three_decimal_checkout_currency() {
        let table = ShippingTable::builtin();

        // US rule 50.00 USD -> 46.00 EUR -> 19.247 OMR
        let cost = table.calculate("US", "OMR", 0);
        assert_eq!(cost, 19247);
    }

    #[test]
    fn test_unknown_country_uses_default_rule() {
        let table = ShippingTable::builtin();

        assert_eq!(table.calculate("ZZ", "USD", 5000), 5000);
        assert_eq!(table.calculate("ZZ", "USD", 23000), 0);
        assert_eq!(table.zone_for("ZZ"), "ROW");
    }

    #[test]
    fn test_unknown_currency_falls_back_to_reference() {
        let table = ShippingTable::builtin();

        // Unknown code evaluates as EUR: 50.00 USD -> 46.00 EUR
        assert_eq!(table.calculate("US", "XYZ", 0), table.calculate("US", "EUR", 0));
        assert_eq!(table.calculate("US", "XYZ", 0), 4600);
    }

    #[test]
    fn test_builtin_zones() {
        let table = ShippingTable::builtin();

        assert_eq!(table.zone_for("AE"), "UAE");
        assert_eq!(table.zone_for("SA"), "MIDDLE_EAST");
        assert_eq!(table.zone_for("GB"), "UK");
        assert_eq!(table.zone_for("FR"), "EUROPE");
        assert_eq!(table.zone_for("US"), "USA");
    }

    #[test]
    fn test_from_toml_override() {
        let toml_str = r#"
            [default]
            zone = "ROW"
            currency = "USD"
            cost = 4000
            threshold = 20000

            [countries.GB]
            zone = "UK"
            currency = "GBP"
            cost = 1290
            threshold = 17200

            [countries.XX]
            zone = "TEST"
            currency = "NOPE"
            cost = 100
            threshold = 200
        "#;

        let table = ShippingTable::from_toml(toml_str).unwrap();

        assert_eq!(table.calculate("GB", "GBP", 5000), 1290);
        assert_eq!(table.calculate("GB", "GBP", 17200), 0);
        assert_eq!(table.calculate("ZZ", "USD", 1000), 4000);
        // Unknown native currency degrades to the reference currency
        assert_eq!(table.rule_for("XX").native_currency, REFERENCE_CURRENCY);
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(ShippingTable::from_toml("not toml at all [").is_err());
    }
}
