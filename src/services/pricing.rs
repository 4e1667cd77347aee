//! Currency conversion and display-price computation.
//!
//! Everything here is a pure function of its inputs. Prices are stored in
//! canonical units and only converted for presentation, except at the
//! payment boundary where the gateway charges in the display currency.

use crate::errors::ServiceError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

/// Largest storefront-wide discount the admin console allows
pub const MAX_DISCOUNT_PCT: Decimal = dec!(90);

/// Display currencies offered by the storefront
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Inr,
}

impl Currency {
    /// Fixed multiplier from canonical units into this currency
    pub fn rate(self) -> Decimal {
        match self {
            Currency::Usd => Decimal::ONE,
            Currency::Eur => dec!(0.92),
            Currency::Gbp => dec!(0.80),
            Currency::Inr => dec!(83),
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Gbp => "£",
            Currency::Inr => "₹",
        }
    }

    /// Lower-case ISO code, as payment gateways expect it
    pub fn code_lowercase(self) -> String {
        self.to_string().to_ascii_lowercase()
    }

    /// Parses a currency code, rejecting anything outside the rate table
    pub fn parse(code: &str) -> Result<Self, ServiceError> {
        code.trim().parse::<Currency>().map_err(|_| {
            let supported: Vec<String> = Currency::iter().map(|c| c.to_string()).collect();
            ServiceError::ValidationError(format!(
                "Unsupported currency '{}'. Supported: {}",
                code.trim(),
                supported.join(", ")
            ))
        })
    }
}

/// Explicit pricing context passed into every pricing call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PricingConfig {
    pub currency: Currency,
    pub discount_pct: Decimal,
}

impl PricingConfig {
    pub fn new(currency: Currency, discount_pct: Decimal) -> Result<Self, ServiceError> {
        if discount_pct < Decimal::ZERO || discount_pct > MAX_DISCOUNT_PCT {
            return Err(ServiceError::ValidationError(format!(
                "Discount must be between 0 and {}%",
                MAX_DISCOUNT_PCT
            )));
        }
        Ok(Self {
            currency,
            discount_pct,
        })
    }

    pub fn has_global_discount(&self) -> bool {
        self.discount_pct > Decimal::ZERO
    }
}

/// Price as shown to the shopper, in the display currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayPrice {
    pub has_discount: bool,
    #[serde(rename = "originalDisplay", with = "rust_decimal::serde::float_option")]
    #[schema(value_type = Option<f64>)]
    pub original: Option<Decimal>,
    #[serde(rename = "finalDisplay", with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub final_price: Decimal,
}

/// Converts a canonical amount into the given currency
pub fn convert(amount: Decimal, currency: Currency) -> Decimal {
    amount * currency.rate()
}

/// Computes the display price for a canonical base price.
///
/// A storefront-wide discount takes precedence over a stored original
/// price; while it is active the struck-through figure is the undiscounted
/// converted base, never the stored original price.
pub fn display_price(
    base: Decimal,
    original_price: Option<Decimal>,
    cfg: &PricingConfig,
) -> DisplayPrice {
    let converted_base = convert(base, cfg.currency);

    if cfg.has_global_discount() {
        let factor = Decimal::ONE - cfg.discount_pct / Decimal::ONE_HUNDRED;
        return DisplayPrice {
            has_discount: true,
            original: Some(converted_base),
            final_price: converted_base * factor,
        };
    }

    match original_price {
        Some(original) => DisplayPrice {
            has_discount: true,
            original: Some(convert(original, cfg.currency)),
            final_price: converted_base,
        },
        None => DisplayPrice {
            has_discount: false,
            original: None,
            final_price: converted_base,
        },
    }
}

/// Rounds to two places the way the storefront displays money
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Symbol followed by the amount fixed to two decimals, no grouping
pub fn format_currency(amount: Decimal, currency: Currency) -> String {
    format!("{}{:.2}", currency.symbol(), round_money(amount))
}

/// Converts a display amount into gateway minor units (cents, paise, ...)
pub fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Amount must be greater than zero".to_string(),
        ));
    }

    let minor = (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    i64::try_from(minor)
        .map_err(|_| ServiceError::ValidationError("Amount is too large".to_string()))
}
