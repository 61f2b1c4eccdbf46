//! Money helpers: currencies, output rounding, and the exchange-rate seam.
//!
//! Amounts are `rust_decimal::Decimal` everywhere. Intermediate sums keep full
//! precision; only values leaving the domain (stored totals, report figures)
//! are rounded with [`round_money`].

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Decimal places kept for monetary output values.
pub const MONEY_DP: u32 = 2;

/// Round a monetary value to 2 decimal places, half-up (midpoint away from zero).
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Invoice currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Mad,
    Eur,
    Usd,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Mad => "MAD",
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MAD" => Ok(Currency::Mad),
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            _ => Err(DomainError::validation(
                "currency must be one of: MAD, EUR, USD",
            )),
        }
    }
}

/// Exchange-rate lookup used when amounts in different currencies are combined.
///
/// Treated as an opaque collaborator: the domain never decides where rates come from.
pub trait ExchangeRateProvider: Send + Sync {
    /// Units of `to` per one unit of `from`.
    fn rate(&self, from: Currency, to: Currency) -> Decimal;

    /// Convert `amount` from one currency to another (full precision, unrounded).
    fn convert(&self, amount: Decimal, from: Currency, to: Currency) -> DomainResult<Decimal> {
        if from == to {
            return Ok(amount);
        }
        amount
            .checked_mul(self.rate(from, to))
            .ok_or_else(|| DomainError::validation(format!("amount overflow converting {from} to {to}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up_at_two_places() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
        assert_eq!(round_money(dec!(2.675)), dec!(2.68));
    }

    #[test]
    fn currency_parses_case_insensitively() {
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::Eur);
        assert!("GBP".parse::<Currency>().is_err());
    }

    #[test]
    fn currency_serializes_as_iso_code() {
        let json = serde_json::to_string(&Currency::Usd).unwrap();
        assert_eq!(json, "\"USD\"");
    }

    struct Fixed;

    impl ExchangeRateProvider for Fixed {
        fn rate(&self, _from: Currency, _to: Currency) -> Decimal {
            dec!(10)
        }
    }

    #[test]
    fn convert_is_identity_for_same_currency() {
        assert_eq!(Fixed.convert(dec!(3), Currency::Mad, Currency::Mad), Ok(dec!(3)));
        assert_eq!(Fixed.convert(dec!(3), Currency::Eur, Currency::Mad), Ok(dec!(30)));
    }

    #[test]
    fn convert_overflow_is_a_validation_error() {
        let err = Fixed.convert(Decimal::MAX, Currency::Eur, Currency::Mad).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
