//! Selling-price calculation.
//!
//! Prices are rupiah amounts handled exclusively as `Decimal`; the selling
//! price of a product is its purchase cost plus the active tax, rounded up
//! to the nearest thousand.

use rust_decimal::Decimal;

use crate::errors::ServiceError;

/// `selling_price = ceil(base_price * (1 + tax_rate) / 1000) * 1000`
///
/// `tax_rate` is a fraction (0.11 for an 11% VAT). The result is always a
/// non-negative multiple of 1000 and never undercuts the taxed price.
pub fn selling_price(base_price: Decimal, tax_rate: Decimal) -> Decimal {
    let taxed = base_price * (Decimal::ONE + tax_rate);
    (taxed / Decimal::ONE_THOUSAND).ceil() * Decimal::ONE_THOUSAND
}

/// Validates pricing inputs before they reach [`selling_price`].
pub fn validate_pricing_inputs(
    base_price: Decimal,
    tax_rate: Decimal,
) -> Result<(), ServiceError> {
    if base_price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Base price cannot be negative".to_string(),
        ));
    }
    if tax_rate < Decimal::ZERO || tax_rate >= Decimal::ONE {
        return Err(ServiceError::ValidationError(
            "Tax rate must be a fraction between 0 and 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case(dec!(10_000), dec!(0.11), dec!(12_000) ; "11 percent rounds up")]
    #[test_case(dec!(9_000), dec!(0), dec!(9_000) ; "zero rate keeps exact multiples")]
    #[test_case(dec!(9_001), dec!(0), dec!(10_000) ; "zero rate still rounds up")]
    #[test_case(dec!(0), dec!(0.11), dec!(0) ; "zero base is zero")]
    #[test_case(dec!(1), dec!(0.11), dec!(1_000) ; "tiny base rounds to one thousand")]
    #[test_case(dec!(100_000), dec!(0.1), dec!(110_000) ; "exact multiple is not bumped")]
    #[test_case(dec!(123_456), dec!(0.11), dec!(138_000) ; "typical catalog price")]
    fn selling_price_cases(base: Decimal, rate: Decimal, expected: Decimal) {
        assert_eq!(selling_price(base, rate), expected);
    }

    #[test]
    fn negative_base_price_is_rejected() {
        let err = validate_pricing_inputs(dec!(-1), dec!(0.11)).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn rate_of_one_or_more_is_rejected() {
        assert!(validate_pricing_inputs(dec!(10_000), dec!(1)).is_err());
        assert!(validate_pricing_inputs(dec!(10_000), dec!(0.99)).is_ok());
    }
}
