use bigdecimal::{BigDecimal, RoundingMode};
use std::str::FromStr;

/// Shipping cost policy applied at checkout: a flat rate, or free above a
/// subtotal threshold.
#[derive(Debug, Clone)]
pub enum ShippingPolicy {
    FlatRate(BigDecimal),
    FreeOverThreshold {
        threshold: BigDecimal,
        rate: BigDecimal,
    },
}

impl ShippingPolicy {
    pub fn cost_for(&self, subtotal: &BigDecimal) -> BigDecimal {
        match self {
            ShippingPolicy::FlatRate(rate) => rate.clone(),
            ShippingPolicy::FreeOverThreshold { threshold, rate } => {
                if subtotal >= threshold {
                    BigDecimal::from(0)
                } else {
                    rate.clone()
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub tax_rate: BigDecimal,
    pub shipping: ShippingPolicy,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: BigDecimal::from_str("0.10").expect("valid decimal literal"),
            shipping: ShippingPolicy::FlatRate(
                BigDecimal::from_str("10.00").expect("valid decimal literal"),
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderTotals {
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub shipping_cost: BigDecimal,
    pub total: BigDecimal,
}

impl PricingConfig {
    /// Price a checkout: tax and shipping derived from the cart subtotal,
    /// all amounts carried to two decimal places.
    pub fn quote(&self, subtotal: BigDecimal) -> OrderTotals {
        let subtotal = subtotal.with_scale_round(2, RoundingMode::HalfUp);
        let tax = (&subtotal * &self.tax_rate).with_scale_round(2, RoundingMode::HalfUp);
        let shipping_cost = self
            .shipping
            .cost_for(&subtotal)
            .with_scale_round(2, RoundingMode::HalfUp);
        let total = &subtotal + &tax + &shipping_cost;
        OrderTotals {
            subtotal,
            tax,
            shipping_cost,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn default_quote_applies_ten_percent_tax_and_flat_shipping() {
        let totals = PricingConfig::default().quote(dec("25.00"));
        assert_eq!(totals.subtotal, dec("25.00"));
        assert_eq!(totals.tax, dec("2.50"));
        assert_eq!(totals.shipping_cost, dec("10.00"));
        assert_eq!(totals.total, dec("37.50"));
    }

    #[test]
    fn tax_rounds_half_up_to_cents() {
        let totals = PricingConfig::default().quote(dec("10.25"));
        // 10.25 * 0.10 = 1.025 → 1.03
        assert_eq!(totals.tax, dec("1.03"));
    }

    #[test]
    fn free_shipping_above_threshold() {
        let config = PricingConfig {
            tax_rate: dec("0.10"),
            shipping: ShippingPolicy::FreeOverThreshold {
                threshold: dec("50.00"),
                rate: dec("10.00"),
            },
        };
        assert_eq!(config.quote(dec("49.99")).shipping_cost, dec("10.00"));
        assert_eq!(config.quote(dec("50.00")).shipping_cost, dec("0.00"));
        assert_eq!(config.quote(dec("120.00")).total, dec("132.00"));
    }
}
