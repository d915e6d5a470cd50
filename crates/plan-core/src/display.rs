//! Presentation settings: display currency and exchange rates.
//!
//! The forecast engine works in a single base currency (BDT) and never
//! reads these settings; they are passed explicitly to whatever renders
//! the results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::ValidationError;

/// Supported display currencies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Bangladeshi taka, the base currency of all stored amounts.
    #[default]
    BDT,
    /// US dollar.
    USD,
    /// Pound sterling.
    GBP,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::BDT, Currency::USD, Currency::GBP];

    pub fn code(self) -> &'static str {
        match self {
            Currency::BDT => "BDT",
            Currency::USD => "USD",
            Currency::GBP => "GBP",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::BDT => "৳",
            Currency::USD => "$",
            Currency::GBP => "£",
        }
    }

    /// Case-insensitive lookup by ISO code.
    pub fn from_code(code: &str) -> Option<Currency> {
        Currency::ALL
            .into_iter()
            .find(|c| c.code().eq_ignore_ascii_case(code.trim()))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Display currency plus the number of base units per unit of each currency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub currency: Currency,
    pub exchange_rates: BTreeMap<Currency, Decimal>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        let exchange_rates = BTreeMap::from([
            (Currency::BDT, Decimal::ONE),
            (Currency::USD, Decimal::new(117, 0)),
            (Currency::GBP, Decimal::new(146, 0)),
        ]);
        Self {
            currency: Currency::BDT,
            exchange_rates,
        }
    }
}

impl DisplaySettings {
    /// Every supported currency needs a strictly positive rate.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for c in Currency::ALL {
            match self.exchange_rates.get(&c) {
                Some(rate) if *rate > Decimal::ZERO => {}
                _ => return Err(ValidationError::InvalidExchangeRate(c.code().to_string())),
            }
        }
        Ok(())
    }

    /// Same rates, different display currency.
    pub fn with_currency(&self, currency: Currency) -> Self {
        Self {
            currency,
            exchange_rates: self.exchange_rates.clone(),
        }
    }

    fn rate(&self) -> Decimal {
        match self.exchange_rates.get(&self.currency) {
            Some(r) if *r > Decimal::ZERO => *r,
            _ => Decimal::ONE,
        }
    }

    /// Base-currency amount expressed in the display currency.
    pub fn convert(&self, amount: Decimal) -> Decimal {
        amount / self.rate()
    }

    /// Display-currency amount expressed in the base currency.
    pub fn to_base(&self, amount: Decimal) -> Decimal {
        amount * self.rate()
    }

    /// Converted amount rounded to two places with the currency symbol.
    pub fn format_money(&self, amount: Decimal) -> String {
        format!("{}{:.2}", self.currency.symbol(), self.convert(amount).round_dp(2))
    }
}
