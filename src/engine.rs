//! Amortization engine.
//!
//! Turns a [`FinancingInput`] into a [`FinancingResult`]: principal financed,
//! level (annuity) payment, the full amortization schedule and the totals of
//! interest, insurance and commission. Nothing is rounded here; rounding is a
//! presentation concern.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{FinancingError, InputField};
use crate::input::{FinancingInput, ITBIS_RATE};

/// Payment details for a single month of the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationRow {
    /// 1-based installment number.
    pub period: u32,
    /// The portion of the base payment that covers interest.
    pub interest: Decimal,
    /// The portion of the base payment that reduces the principal.
    pub principal: Decimal,
    /// The level payment, identical on every row.
    pub base_payment: Decimal,
    pub insurance: Decimal,
    /// Amortized principal still owed after this installment (balloon excluded).
    pub remaining_balance: Decimal,
}

/// Complete quote for one financing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingResult {
    pub principal_financed: Decimal,
    pub down_payment_amount: Decimal,
    pub down_payment_percent: Decimal,
    /// Lump sum owed at the end of the term, outside the schedule.
    pub balloon_amount: Decimal,
    /// Nominal monthly rate as a percentage.
    pub monthly_rate_percent: Decimal,
    /// Level payment covering interest and principal only.
    pub base_payment: Decimal,
    pub commission_monthly: Decimal,
    pub itbis_monthly: Decimal,
    /// Base payment plus insurance, prorated commission and ITBIS.
    pub monthly_payment: Decimal,
    pub total_interest: Decimal,
    pub total_insurance: Decimal,
    pub total_commission: Decimal,
    /// Every installment plus down payment and balloon.
    pub total_cost: Decimal,
    pub schedule: Vec<AmortizationRow>,
}

impl FinancingResult {
    /// Interest and principal split of the first installment.
    pub fn first_period(&self) -> Option<&AmortizationRow> {
        self.schedule.first()
    }

    /// Balance owed after the last installment, balloon excluded.
    pub fn final_balance(&self) -> Decimal {
        self.schedule
            .last()
            .map(|row| row.remaining_balance)
            .unwrap_or(self.principal_financed)
    }
}

/// Converts an annual percentage into the nominal monthly decimal rate.
///
/// 22 (%) becomes 0.22 / 12.
pub fn monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    annual_rate_percent / dec!(100) / dec!(12)
}

/// Level payment that amortizes `principal` over `periods` at `monthly_rate`.
///
/// Uses PMT = P * [i(1 + i)^n] / [(1 + i)^n – 1], falling back to straight-line
/// `P / n` when the rate is zero. Returns `None` if `periods` is zero or the
/// arithmetic overflows.
pub fn level_payment(principal: Decimal, monthly_rate: Decimal, periods: u32) -> Option<Decimal> {
    if periods == 0 {
        return None;
    }
    let n = Decimal::from(periods);

    if monthly_rate.is_zero() {
        return principal.checked_div(n);
    }

    let growth = (Decimal::ONE + monthly_rate).checked_powu(u64::from(periods))?;
    principal
        .checked_mul(monthly_rate)?
        .checked_mul(growth)?
        .checked_div(growth - Decimal::ONE)
}

/// Computes the full financing quote.
///
/// # Errors
///
/// Returns [`FinancingError::InvalidInput`] naming the first field that fails
/// validation, or the rate field when the payment cannot be represented.
/// Validation bounds every amount and the rate, so the remaining arithmetic
/// stays within the decimal range.
pub fn compute(input: &FinancingInput) -> Result<FinancingResult, FinancingError> {
    input.validate()?;

    let n = input.term_months;
    let periods = Decimal::from(n);
    let r = monthly_rate(input.annual_rate_percent);

    let balloon_amount = input.balloon_amount();
    let down_payment_amount = input.down_payment_amount();
    let principal = (input.price - down_payment_amount - balloon_amount).max(Decimal::ZERO);

    let base_payment = level_payment(principal, r, n).ok_or_else(|| {
        FinancingError::invalid(
            InputField::Rate,
            "rate and term produce a payment that cannot be represented",
        )
    })?;

    let commission_monthly = input.commission_base() / periods;
    let itbis_monthly = if input.itbis_on_commission {
        commission_monthly * ITBIS_RATE
    } else {
        Decimal::ZERO
    };

    let monthly_payment =
        base_payment + input.monthly_insurance + commission_monthly + itbis_monthly;

    debug!(
        %principal,
        %base_payment,
        %monthly_payment,
        term_months = n,
        "computed level payment"
    );

    let schedule = build_schedule(principal, r, base_payment, input.monthly_insurance, n);
    let total_interest: Decimal = schedule.iter().map(|row| row.interest).sum();

    Ok(FinancingResult {
        principal_financed: principal,
        down_payment_amount,
        down_payment_percent: input.down_payment_percent(),
        balloon_amount,
        monthly_rate_percent: r * dec!(100),
        base_payment,
        commission_monthly,
        itbis_monthly,
        monthly_payment,
        total_interest,
        total_insurance: input.monthly_insurance * periods,
        total_commission: (commission_monthly + itbis_monthly) * periods,
        total_cost: monthly_payment * periods + down_payment_amount + balloon_amount,
        schedule,
    })
}

fn build_schedule(
    principal: Decimal,
    monthly_rate: Decimal,
    base_payment: Decimal,
    insurance: Decimal,
    periods: u32,
) -> Vec<AmortizationRow> {
    let mut balance = principal;
    let mut schedule = Vec::with_capacity(periods as usize);

    for period in 1..=periods {
        let interest = balance * monthly_rate;
        // Never amortize more than what is still owed.
        let principal_part = (base_payment - interest).max(Decimal::ZERO).min(balance);
        balance -= principal_part;

        trace!(period, %interest, %principal_part, %balance, "schedule row");

        schedule.push(AmortizationRow {
            period,
            interest,
            principal: principal_part,
            base_payment,
            insurance,
            remaining_balance: balance,
        });
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Commission, MAX_AMOUNT, MAX_ANNUAL_RATE_PERCENT};
    use rust_decimal_macros::dec;

    #[test]
    fn test_level_payment_matches_price_table() {
        // 12,000 over 12 months at 1% a month.
        let payment = level_payment(dec!(12000), dec!(0.01), 12).unwrap();
        assert_eq!(payment.round_dp(2), dec!(1066.19));
    }

    #[test]
    fn test_level_payment_zero_rate_is_straight_line() {
        assert_eq!(level_payment(dec!(240000), Decimal::ZERO, 24), Some(dec!(10000)));
    }

    #[test]
    fn test_level_payment_zero_periods() {
        assert_eq!(level_payment(dec!(1000), dec!(0.01), 0), None);
    }

    #[test]
    fn test_monthly_rate() {
        assert_eq!(monthly_rate(dec!(12)), dec!(0.01));
        assert!(monthly_rate(Decimal::ZERO).is_zero());
    }

    #[test]
    fn test_compute_storefront_defaults() {
        let result = compute(&FinancingInput::for_price(dec!(1_000_000))).unwrap();

        assert_eq!(result.principal_financed, dec!(800_000));
        assert_eq!(result.base_payment.round_dp(2), dec!(41502.52));
        assert_eq!(result.monthly_payment.round_dp(2), dec!(50919.19));
        assert_eq!(result.total_insurance, dec!(216_000));
        assert_eq!(result.total_commission.round_dp(6), dec!(10_000));
        assert_eq!(result.schedule.len(), 24);
        assert!(result.final_balance() < dec!(0.01));
    }

    #[test]
    fn test_compute_itbis_adds_eighteen_percent_on_commission() {
        let input = FinancingInput::for_price(dec!(1_200_000))
            .with_commission(Commission::Flat(dec!(24_000)))
            .with_term(12)
            .with_itbis(true);
        let result = compute(&input).unwrap();

        assert_eq!(result.commission_monthly, dec!(2000));
        assert_eq!(result.itbis_monthly, dec!(360));
        assert_eq!(result.total_commission, dec!(28_320));
    }

    #[test]
    fn test_compute_balloon_is_excluded_from_schedule() {
        let input = FinancingInput::for_price(dec!(1_000_000)).with_balloon(dec!(30));
        let result = compute(&input).unwrap();

        assert_eq!(result.balloon_amount, dec!(300_000));
        assert_eq!(result.principal_financed, dec!(500_000));
        assert!(result.final_balance() < dec!(0.01));
        assert_eq!(
            result.total_cost,
            result.monthly_payment * dec!(24) + dec!(200_000) + dec!(300_000)
        );
    }

    #[test]
    fn test_compute_principal_floors_at_zero() {
        // 80% down plus 40% balloon leaves nothing to amortize.
        let input = FinancingInput::for_price(dec!(100_000))
            .with_down_payment_percent(dec!(80))
            .with_balloon(dec!(40));
        let result = compute(&input).unwrap();

        assert!(result.principal_financed.is_zero());
        assert!(result.base_payment.is_zero());
        assert!(result.schedule.iter().all(|row| row.remaining_balance.is_zero()));
    }

    #[test]
    fn test_compute_rejects_overflowing_rate() {
        let input = FinancingInput::for_price(dec!(100_000))
            .with_annual_rate(MAX_ANNUAL_RATE_PERCENT)
            .with_term(360);
        let err = compute(&input).unwrap_err();
        assert_eq!(err.field(), InputField::Rate);
    }

    #[test]
    fn test_compute_rejects_unrepresentable_amounts() {
        let err = compute(&FinancingInput::for_price(Decimal::MAX / dec!(2))).unwrap_err();
        assert_eq!(err.field(), InputField::Price);

        let input = FinancingInput::for_price(dec!(100_000))
            .with_insurance(Decimal::MAX / dec!(2))
            .with_term(360);
        let err = compute(&input).unwrap_err();
        assert_eq!(err.field(), InputField::Insurance);
    }

    #[test]
    fn test_compute_largest_accepted_amounts() {
        let input = FinancingInput::for_price(MAX_AMOUNT)
            .with_commission(Commission::Flat(MAX_AMOUNT))
            .with_insurance(MAX_AMOUNT)
            .with_itbis(true)
            .with_annual_rate(dec!(60))
            .with_term(360);
        let result = compute(&input).unwrap();

        assert_eq!(result.schedule.len(), 360);
        assert!(result.total_cost > result.total_insurance);
        assert!(result.final_balance() < dec!(0.01));
    }

    #[test]
    fn test_compute_highest_rate_on_short_term() {
        let input = FinancingInput::for_price(MAX_AMOUNT)
            .with_annual_rate(MAX_ANNUAL_RATE_PERCENT)
            .with_term(1);
        let result = compute(&input).unwrap();

        // A single installment repays the principal plus one month of interest.
        let expected = result.principal_financed * (Decimal::ONE + monthly_rate(MAX_ANNUAL_RATE_PERCENT));
        assert_eq!(result.base_payment.round_dp(6), expected.round_dp(6));
    }
}
