use crate::{
    errors::ServiceError,
    services::pricing::{Currency, PricingConfig},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Presentation settings the admin console edits and the storefront reads.
///
/// These live on the client; the server only validates them when they are
/// passed in as query input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontSettings {
    pub currency: Currency,
    #[serde(default)]
    pub discount_pct: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_banner: Option<String>,
}

impl StorefrontSettings {
    /// Builds settings from loosely typed inputs such as query parameters
    pub fn from_parts(
        currency: Option<&str>,
        discount_pct: Option<Decimal>,
    ) -> Result<Self, ServiceError> {
        let currency = match currency {
            Some(code) if !code.trim().is_empty() => Currency::parse(code)?,
            _ => Currency::default(),
        };
        let settings = Self {
            currency,
            discount_pct: discount_pct.unwrap_or(Decimal::ZERO),
            ..Default::default()
        };
        settings.pricing_config()?;
        Ok(settings)
    }

    pub fn pricing_config(&self) -> Result<PricingConfig, ServiceError> {
        PricingConfig::new(self.currency, self.discount_pct)
    }

    /// Banner text shown above the catalog while a discount runs
    pub fn active_offer(&self) -> Option<String> {
        if self.discount_pct <= Decimal::ZERO {
            return None;
        }
        match (&self.offer_name, &self.offer_banner) {
            (_, Some(banner)) if !banner.trim().is_empty() => Some(banner.trim().to_string()),
            (Some(name), _) if !name.trim().is_empty() => {
                Some(format!("{}: {}% off", name.trim(), self.discount_pct.normalize()))
            }
            _ => Some(format!("{}% off everything", self.discount_pct.normalize())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_query_style_inputs() {
        let settings = StorefrontSettings::from_parts(Some("eur"), Some(dec!(15))).unwrap();
        assert_eq!(settings.currency, Currency::Eur);
        let cfg = settings.pricing_config().unwrap();
        assert!(cfg.has_global_discount());
    }

    #[test]
    fn defaults_to_usd_without_discount() {
        let settings = StorefrontSettings::from_parts(None, None).unwrap();
        assert_eq!(settings.currency, Currency::Usd);
        assert_eq!(settings.active_offer(), None);
    }

    #[test]
    fn rejects_out_of_range_discount() {
        assert!(StorefrontSettings::from_parts(Some("USD"), Some(dec!(95))).is_err());
    }

    #[test]
    fn offer_banner_prefers_explicit_text() {
        let mut settings = StorefrontSettings::from_parts(None, Some(dec!(20))).unwrap();
        assert_eq!(settings.active_offer().as_deref(), Some("20% off everything"));

        settings.offer_name = Some("Spring Sale".into());
        assert_eq!(settings.active_offer().as_deref(), Some("Spring Sale: 20% off"));

        settings.offer_banner = Some("Free proofs this week".into());
        assert_eq!(settings.active_offer().as_deref(), Some("Free proofs this week"));
    }

    #[test]
    fn deserializes_camel_case_payload() {
        let settings: StorefrontSettings =
            serde_json::from_str(r#"{"currency":"GBP","discountPct":10,"offerName":"Launch"}"#)
                .unwrap();
        assert_eq!(settings.currency, Currency::Gbp);
        assert_eq!(settings.discount_pct, dec!(10));
        assert_eq!(settings.offer_name.as_deref(), Some("Launch"));
    }
}
