//! External service adapters.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fatoura_core::{Currency, ExchangeRateProvider};

/// Fixed exchange-rate table quoted against the dirham.
///
/// Cross rates go through MAD.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticExchangeRates;

impl StaticExchangeRates {
    /// MAD per one unit of `currency`.
    fn mad_per_unit(currency: Currency) -> Decimal {
        match currency {
            Currency::Mad => Decimal::ONE,
            Currency::Eur => dec!(10.95),
            Currency::Usd => dec!(9.85),
        }
    }
}

impl ExchangeRateProvider for StaticExchangeRates {
    fn rate(&self, from: Currency, to: Currency) -> Decimal {
        if from == to {
            return Decimal::ONE;
        }
        Self::mad_per_unit(from) / Self::mad_per_unit(to)
    }
}
