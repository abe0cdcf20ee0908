use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{FinancingError, InputField};

/// Longest financing term accepted, in months.
pub const MAX_TERM_MONTHS: u32 = 360;
/// Upper bound of the down payment when expressed as a percent of the price.
pub const MAX_DOWN_PAYMENT_PERCENT: Decimal = dec!(80);
/// Upper bound of the balloon share of the price.
pub const MAX_BALLOON_PERCENT: Decimal = dec!(40);
/// Largest money amount accepted for price, down payment, insurance or a
/// flat commission. Keeps every total of a 360-month schedule representable.
pub const MAX_AMOUNT: Decimal = dec!(1_000_000_000_000);
/// Largest nominal annual rate accepted, in percent.
pub const MAX_ANNUAL_RATE_PERCENT: Decimal = dec!(1000);
/// Dominican ITBIS rate applied on the financing commission.
pub const ITBIS_RATE: Decimal = dec!(0.18);
/// Terms offered by the storefront calculator.
pub const TERM_PRESETS: [u32; 6] = [12, 18, 24, 36, 48, 60];

const HUNDRED: Decimal = dec!(100);

/// Down payment as supplied by the caller.
///
/// Only the amount is canonical; the percent is always derived from it on read
/// so the two views cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum DownPayment {
    Amount(Decimal),
    Percent(Decimal),
}

/// Financing commission, either a share of the vehicle price or a flat fee.
/// It is prorated evenly over the term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Commission {
    Percent(Decimal),
    #[serde(alias = "amount")]
    Flat(Decimal),
}

/// Values used when a request leaves a field out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingDefaults {
    pub term_months: u32,
    pub down_payment_percent: Decimal,
    pub annual_rate_percent: Decimal,
    pub commission: Commission,
    pub monthly_insurance: Decimal,
    pub balloon_percent: Decimal,
    pub itbis_on_commission: bool,
}

impl Default for FinancingDefaults {
    fn default() -> Self {
        Self {
            term_months: 24,
            down_payment_percent: dec!(20),
            annual_rate_percent: dec!(22),
            commission: Commission::Percent(dec!(1)),
            monthly_insurance: dec!(9000),
            balloon_percent: Decimal::ZERO,
            itbis_on_commission: false,
        }
    }
}

impl FinancingDefaults {
    /// Builds an input for `price` with every other field taken from the defaults.
    pub fn input_for(&self, price: Decimal) -> FinancingInput {
        FinancingInput {
            price,
            down_payment: DownPayment::Percent(self.down_payment_percent),
            term_months: self.term_months,
            annual_rate_percent: self.annual_rate_percent,
            commission: self.commission,
            monthly_insurance: self.monthly_insurance,
            balloon_percent: self.balloon_percent,
            itbis_on_commission: self.itbis_on_commission,
        }
    }
}

/// Parameters of a single financing calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingInput {
    /// Vehicle price.
    pub price: Decimal,
    pub down_payment: DownPayment,
    /// Number of monthly installments.
    pub term_months: u32,
    /// Nominal annual rate as a percentage (e.g., 22 for 22%).
    pub annual_rate_percent: Decimal,
    pub commission: Commission,
    /// Insurance charged on every installment.
    pub monthly_insurance: Decimal,
    /// Share of the price deferred to a lump sum at the end of the term.
    pub balloon_percent: Decimal,
    /// Adds ITBIS on top of the monthly commission.
    pub itbis_on_commission: bool,
}

impl FinancingInput {
    /// An input for `price` seeded with [`FinancingDefaults::default`].
    pub fn for_price(price: Decimal) -> Self {
        FinancingDefaults::default().input_for(price)
    }

    /// Sets the down payment as an amount.
    pub fn with_down_payment_amount(mut self, amount: Decimal) -> Self {
        self.down_payment = DownPayment::Amount(amount);
        self
    }

    /// Sets the down payment as a percent of the price.
    pub fn with_down_payment_percent(mut self, percent: Decimal) -> Self {
        self.down_payment = DownPayment::Percent(percent);
        self
    }

    /// Sets the number of monthly installments.
    pub fn with_term(mut self, term_months: u32) -> Self {
        self.term_months = term_months;
        self
    }

    /// Sets the nominal annual rate, in percent.
    pub fn with_annual_rate(mut self, annual_rate_percent: Decimal) -> Self {
        self.annual_rate_percent = annual_rate_percent;
        self
    }

    /// Sets the financing commission.
    pub fn with_commission(mut self, commission: Commission) -> Self {
        self.commission = commission;
        self
    }

    /// Sets the insurance charged every month.
    pub fn with_insurance(mut self, monthly_insurance: Decimal) -> Self {
        self.monthly_insurance = monthly_insurance;
        self
    }

    /// Sets the balloon share of the price, in percent.
    pub fn with_balloon(mut self, balloon_percent: Decimal) -> Self {
        self.balloon_percent = balloon_percent;
        self
    }

    /// Turns ITBIS on the commission on or off.
    pub fn with_itbis(mut self, itbis_on_commission: bool) -> Self {
        self.itbis_on_commission = itbis_on_commission;
        self
    }

    /// Down payment resolved to an amount.
    pub fn down_payment_amount(&self) -> Decimal {
        match self.down_payment {
            DownPayment::Amount(amount) => amount,
            DownPayment::Percent(percent) => self.price.saturating_mul(percent) / HUNDRED,
        }
    }

    /// Down payment as a percent of the price, derived from the amount and
    /// clamped to `[0, 80]`.
    pub fn down_payment_percent(&self) -> Decimal {
        match self.down_payment {
            DownPayment::Percent(percent) => percent,
            DownPayment::Amount(_) if self.price <= Decimal::ZERO => Decimal::ZERO,
            DownPayment::Amount(amount) => amount
                .checked_div(self.price)
                .unwrap_or(Decimal::MAX)
                .saturating_mul(HUNDRED)
                .clamp(Decimal::ZERO, MAX_DOWN_PAYMENT_PERCENT),
        }
    }

    /// Lump sum deferred to the end of the term.
    pub fn balloon_amount(&self) -> Decimal {
        self.price.saturating_mul(self.balloon_percent) / HUNDRED
    }

    /// Total commission before proration.
    pub fn commission_base(&self) -> Decimal {
        match self.commission {
            Commission::Percent(percent) => self.price.saturating_mul(percent) / HUNDRED,
            Commission::Flat(amount) => amount,
        }
    }

    /// Checks every precondition, reporting only the first one violated.
    pub fn validate(&self) -> Result<(), FinancingError> {
        if self.term_months == 0 {
            return Err(FinancingError::invalid(
                InputField::Term,
                "term must be at least one month",
            ));
        }
        if self.term_months > MAX_TERM_MONTHS {
            return Err(FinancingError::invalid(
                InputField::Term,
                format!("term cannot exceed {MAX_TERM_MONTHS} months"),
            ));
        }

        if self.price <= Decimal::ZERO {
            return Err(FinancingError::invalid(
                InputField::Price,
                "price must be greater than zero",
            ));
        }
        if self.price > MAX_AMOUNT {
            return Err(FinancingError::invalid(
                InputField::Price,
                format!("price cannot exceed {MAX_AMOUNT}"),
            ));
        }

        match self.down_payment {
            DownPayment::Amount(amount) if amount < Decimal::ZERO => {
                return Err(FinancingError::invalid(
                    InputField::DownPayment,
                    "down payment cannot be negative",
                ));
            }
            DownPayment::Amount(amount) if amount >= self.price => {
                return Err(FinancingError::invalid(
                    InputField::DownPayment,
                    "down payment must be lower than the vehicle price",
                ));
            }
            DownPayment::Percent(percent)
                if percent < Decimal::ZERO || percent > MAX_DOWN_PAYMENT_PERCENT =>
            {
                return Err(FinancingError::invalid(
                    InputField::DownPayment,
                    format!("down payment percent must be between 0 and {MAX_DOWN_PAYMENT_PERCENT}"),
                ));
            }
            _ => {}
        }

        if self.annual_rate_percent < Decimal::ZERO {
            return Err(FinancingError::invalid(
                InputField::Rate,
                "annual rate cannot be negative",
            ));
        }
        if self.annual_rate_percent > MAX_ANNUAL_RATE_PERCENT {
            return Err(FinancingError::invalid(
                InputField::Rate,
                format!("annual rate cannot exceed {MAX_ANNUAL_RATE_PERCENT}%"),
            ));
        }

        if self.monthly_insurance < Decimal::ZERO {
            return Err(FinancingError::invalid(
                InputField::Insurance,
                "monthly insurance cannot be negative",
            ));
        }
        if self.monthly_insurance > MAX_AMOUNT {
            return Err(FinancingError::invalid(
                InputField::Insurance,
                format!("monthly insurance cannot exceed {MAX_AMOUNT}"),
            ));
        }

        if self.balloon_percent < Decimal::ZERO || self.balloon_percent > MAX_BALLOON_PERCENT {
            return Err(FinancingError::invalid(
                InputField::Balloon,
                format!("balloon percent must be between 0 and {MAX_BALLOON_PERCENT}"),
            ));
        }

        match self.commission {
            Commission::Percent(percent) if percent < Decimal::ZERO || percent > HUNDRED => {
                Err(FinancingError::invalid(
                    InputField::Commission,
                    "commission percent must be between 0 and 100",
                ))
            }
            Commission::Flat(amount) if amount < Decimal::ZERO => Err(FinancingError::invalid(
                InputField::Commission,
                "commission amount cannot be negative",
            )),
            Commission::Flat(amount) if amount > MAX_AMOUNT => Err(FinancingError::invalid(
                InputField::Commission,
                format!("commission amount cannot exceed {MAX_AMOUNT}"),
            )),
            _ => Ok(()),
        }
    }
}
