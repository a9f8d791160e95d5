//! # Money and Currency Model
//!
//! Amounts are integer minor units (cents, fils) everywhere inside the
//! bridge. Precision is a property of the currency, not the amount: the
//! three Gulf currencies OMR, KWD and BHD carry three decimal places, the
//! rest carry two. Conversion to major-unit decimal strings happens only at
//! the system boundary, and the single place floating point is allowed in
//! is the exchange-rate conversion in [`convert_minor`].

use serde::{Deserialize, Serialize};

/// Supported checkout currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    SAR,
    AED,
    QAR,
    OMR,
    KWD,
    BHD,
}

/// The common reference currency all exchange rates are expressed against.
pub const REFERENCE_CURRENCY: Currency = Currency::EUR;

impl Currency {
    /// Returns the ISO 4217 currency code in lowercase (processor wire format)
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::SAR => "sar",
            Currency::AED => "aed",
            Currency::QAR => "qar",
            Currency::OMR => "omr",
            Currency::KWD => "kwd",
            Currency::BHD => "bhd",
        }
    }

    /// Uppercase code (backend wire format)
    pub fn code(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Parse a currency code, case-insensitive. `None` for unknown codes.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "SAR" => Some(Currency::SAR),
            "AED" => Some(Currency::AED),
            "QAR" => Some(Currency::QAR),
            "OMR" => Some(Currency::OMR),
            "KWD" => Some(Currency::KWD),
            "BHD" => Some(Currency::BHD),
            _ => None,
        }
    }

    /// Display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::SAR => "SAR",
            Currency::AED => "AED",
            Currency::QAR => "QAR",
            Currency::OMR => "OMR",
            Currency::KWD => "KWD",
            Currency::BHD => "BHD",
        }
    }

    /// True for the three-decimal Gulf currencies (OMR, KWD, BHD).
    ///
    /// This is the single source of truth for precision branching; nothing
    /// else in the workspace keeps its own currency-code list.
    pub fn is_three_decimal(&self) -> bool {
        matches!(self, Currency::OMR | Currency::KWD | Currency::BHD)
    }

    /// Number of decimal places in the major-unit representation
    pub fn minor_unit_exponent(&self) -> u8 {
        if self.is_three_decimal() {
            3
        } else {
            2
        }
    }

    /// Minor units per major unit (1000 or 100)
    pub fn minor_unit_divisor(&self) -> i64 {
        if self.is_three_decimal() {
            1000
        } else {
            100
        }
    }

    /// Approximate exchange rate to the reference currency (EUR).
    ///
    /// Static configuration, refreshed operationally, never fetched live.
    pub fn rate_to_reference(&self) -> f64 {
        match self {
            Currency::USD => 0.92,
            Currency::EUR => 1.0,
            Currency::GBP => 1.16,
            Currency::SAR => 0.245,
            Currency::AED => 0.25,
            Currency::QAR => 0.252,
            Currency::OMR => 2.39,
            Currency::KWD => 2.98,
            Currency::BHD => 2.44,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// An amount in integer minor units of a currency.
///
/// Invariant: `amount_minor` is never negative and never fractional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's smallest unit
    pub amount_minor: i64,
    /// Currency
    pub currency: Currency,
}

impl Money {
    /// Create from minor units; negative inputs clamp to zero.
    pub fn from_minor(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor: amount_minor.max(0),
            currency,
        }
    }

    /// Zero in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self::from_minor(0, currency)
    }

    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    /// Integer addition, same currency assumed by callers
    pub fn plus_minor(&self, amount_minor: i64) -> Self {
        Self::from_minor(self.amount_minor + amount_minor, self.currency)
    }

    /// Saturating subtraction that preserves the non-negative invariant
    pub fn saturating_sub_minor(&self, amount_minor: i64) -> Self {
        Self::from_minor(self.amount_minor.saturating_sub(amount_minor), self.currency)
    }

    /// Render as a major-unit decimal string with the currency's exact
    /// precision ("16.50", "6.350"). Pure integer arithmetic.
    pub fn to_major_units(&self) -> String {
        major_units_string(self.amount_minor, self.currency)
    }

    /// Display with symbol, e.g. "$16.50"
    pub fn display(&self) -> String {
        format!("{}{}", self.currency.symbol(), self.to_major_units())
    }
}

/// Major-unit decimal string for a raw minor-unit amount.
pub fn major_units_string(amount_minor: i64, currency: Currency) -> String {
    let amount = amount_minor.max(0);
    let divisor = currency.minor_unit_divisor();
    format!(
        "{}.{:0width$}",
        amount / divisor,
        amount % divisor,
        width = currency.minor_unit_exponent() as usize
    )
}

/// Convert a minor-unit amount between currencies via the reference-currency
/// rate table, exponent-aware, rounding to the nearest integer minor unit.
///
/// This is the only operation in the money model that touches floating
/// point; each converted figure is rounded exactly once.
pub fn convert_minor(amount_minor: i64, from: Currency, to: Currency) -> i64 {
    if from == to {
        return amount_minor;
    }
    let from_major = amount_minor as f64 / from.minor_unit_divisor() as f64;
    let reference_major = from_major * from.rate_to_reference();
    let to_major = reference_major / to.rate_to_reference();
    (to_major * to.minor_unit_divisor() as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponents() {
        assert_eq!(Currency::USD.minor_unit_exponent(), 2);
        assert_eq!(Currency::EUR.minor_unit_divisor(), 100);
        assert!(Currency::OMR.is_three_decimal());
        assert!(Currency::KWD.is_three_decimal());
        assert!(Currency::BHD.is_three_decimal());
        assert!(!Currency::SAR.is_three_decimal());
        assert_eq!(Currency::KWD.minor_unit_divisor(), 1000);
    }

    #[test]
    fn test_from_code_case_insensitive() {
        assert_eq!(Currency::from_code("usd"), Some(Currency::USD));
        assert_eq!(Currency::from_code("Omr"), Some(Currency::OMR));
        assert_eq!(Currency::from_code("XYZ"), None);
    }

    #[test]
    fn test_major_units_exact_precision() {
        assert_eq!(Money::from_minor(1650, Currency::USD).to_major_units(), "16.50");
        assert_eq!(Money::from_minor(5, Currency::EUR).to_major_units(), "0.05");
        assert_eq!(Money::from_minor(6350, Currency::OMR).to_major_units(), "6.350");
        assert_eq!(Money::from_minor(7, Currency::KWD).to_major_units(), "0.007");
        assert_eq!(Money::from_minor(0, Currency::BHD).to_major_units(), "0.000");
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        let m = Money::from_minor(-500, Currency::USD);
        assert_eq!(m.amount_minor, 0);

        let m = Money::from_minor(300, Currency::USD).saturating_sub_minor(1000);
        assert_eq!(m.amount_minor, 0);
    }

    #[test]
    fn test_convert_identity() {
        assert_eq!(convert_minor(1234, Currency::USD, Currency::USD), 1234);
    }

    #[test]
    fn test_convert_eur_to_usd() {
        // 10.00 EUR / 0.92 = 10.87 USD
        assert_eq!(convert_minor(1000, Currency::EUR, Currency::USD), 1087);
    }

    #[test]
    fn test_convert_exponent_aware() {
        // 15.00 EUR at OMR rate 2.39 -> 6.276 OMR -> 6276 three-decimal units
        let fils = convert_minor(1500, Currency::EUR, Currency::OMR);
        assert_eq!(fils, 6276);
    }

    #[test]
    fn test_convert_round_trip_tolerance() {
        for &target in &[
            Currency::USD,
            Currency::GBP,
            Currency::SAR,
            Currency::OMR,
            Currency::KWD,
            Currency::BHD,
        ] {
            let there = convert_minor(23000, Currency::EUR, target);
            let back = convert_minor(there, target, Currency::EUR);
            assert!(
                (back - 23000).abs() <= 1,
                "round trip via {:?} drifted: {}",
                target,
                back
            );
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(2999, Currency::USD).display(), "$29.99");
        assert_eq!(Money::from_minor(6350, Currency::OMR).display(), "OMR6.350");
    }
}
