//! Display helpers for quotes: currency formatting, rounding and schedule
//! previews. The engine never rounds, so everything shown to a person goes
//! through here.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tabled::{Table, builder::Builder};

use crate::engine::{AmortizationRow, FinancingResult};

/// Rows shown before the caller asks for the full schedule.
pub const PREVIEW_ROWS: usize = 6;

const CURRENCY_PREFIX: &str = "RD$ ";

/// Formats an amount as Dominican pesos rounded to the whole unit,
/// e.g. `RD$ 1,234,568`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{CURRENCY_PREFIX}{grouped}")
    } else {
        format!("{CURRENCY_PREFIX}{grouped}")
    }
}

/// Formats a percentage with two decimals, e.g. `1.83%`.
pub fn format_percent(value: Decimal) -> String {
    format!(
        "{:.2}%",
        value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

fn round_money(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

impl AmortizationRow {
    /// A copy with every amount rounded to `dp` places, midpoint away from zero.
    pub fn rounded(&self, dp: u32) -> Self {
        Self {
            period: self.period,
            interest: round_money(self.interest, dp),
            principal: round_money(self.principal, dp),
            base_payment: round_money(self.base_payment, dp),
            insurance: round_money(self.insurance, dp),
            remaining_balance: round_money(self.remaining_balance, dp),
        }
    }
}

impl FinancingResult {
    /// A copy with every amount, rates included, rounded to `dp` places.
    pub fn rounded(&self, dp: u32) -> Self {
        Self {
            principal_financed: round_money(self.principal_financed, dp),
            down_payment_amount: round_money(self.down_payment_amount, dp),
            down_payment_percent: round_money(self.down_payment_percent, dp),
            balloon_amount: round_money(self.balloon_amount, dp),
            monthly_rate_percent: round_money(self.monthly_rate_percent, dp),
            base_payment: round_money(self.base_payment, dp),
            commission_monthly: round_money(self.commission_monthly, dp),
            itbis_monthly: round_money(self.itbis_monthly, dp),
            monthly_payment: round_money(self.monthly_payment, dp),
            total_interest: round_money(self.total_interest, dp),
            total_insurance: round_money(self.total_insurance, dp),
            total_commission: round_money(self.total_commission, dp),
            total_cost: round_money(self.total_cost, dp),
            schedule: self.schedule.iter().map(|row| row.rounded(dp)).collect(),
        }
    }
}

/// The head of a schedule plus how many rows were left out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulePreview<'a> {
    pub rows: &'a [AmortizationRow],
    pub hidden_rows: usize,
}

/// The first `limit` rows of `schedule`; a limit past the end shows every row.
pub fn preview(schedule: &[AmortizationRow], limit: usize) -> SchedulePreview<'_> {
    let shown = limit.min(schedule.len());
    SchedulePreview {
        rows: &schedule[..shown],
        hidden_rows: schedule.len() - shown,
    }
}

/// Two-column table with the headline figures of a quote.
pub fn render_summary(result: &FinancingResult) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);

    let (first_interest, first_principal) = result
        .first_period()
        .map(|row| (row.interest, row.principal))
        .unwrap_or_default();

    let money_rows = [
        ("Monthly payment", result.monthly_payment),
        ("Base payment", result.base_payment),
        ("Principal financed", result.principal_financed),
        ("Down payment", result.down_payment_amount),
        ("Balloon", result.balloon_amount),
        ("Interest (1st month)", first_interest),
        ("Principal (1st month)", first_principal),
        ("Commission (monthly)", result.commission_monthly),
        ("ITBIS (monthly)", result.itbis_monthly),
        ("Total interest", result.total_interest),
        ("Total insurance", result.total_insurance),
        ("Total commission", result.total_commission),
        ("Total cost", result.total_cost),
    ];

    builder.push_record([
        "Monthly rate".to_string(),
        format_percent(result.monthly_rate_percent),
    ]);
    builder.push_record([
        "Down payment %".to_string(),
        format_percent(result.down_payment_percent),
    ]);
    for (label, amount) in money_rows {
        builder.push_record([label.to_string(), format_currency(amount)]);
    }

    Table::from(builder).to_string()
}

/// Amortization table, one line per installment.
pub fn render_schedule(rows: &[AmortizationRow]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Month", "Interest", "Principal", "Payment", "Insurance", "Balance"]);

    for row in rows {
        builder.push_record([
            row.period.to_string(),
            format_currency(row.interest),
            format_currency(row.principal),
            format_currency(row.base_payment),
            format_currency(row.insurance),
            format_currency(row.remaining_balance),
        ]);
    }

    Table::from(builder).to_string()
}
