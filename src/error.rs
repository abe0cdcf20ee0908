use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The input field that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InputField {
    Term,
    Price,
    DownPayment,
    Rate,
    Insurance,
    Balloon,
    Commission,
}

impl InputField {
    /// Machine-readable error kind reported to API clients.
    pub fn kind(self) -> &'static str {
        match self {
            Self::Term => "invalid_term",
            Self::Price => "invalid_price",
            Self::DownPayment => "invalid_down_payment",
            Self::Rate => "invalid_rate",
            Self::Insurance => "invalid_insurance",
            Self::Balloon => "invalid_balloon",
            Self::Commission => "invalid_commission",
        }
    }
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Term => "term",
            Self::Price => "price",
            Self::DownPayment => "downPayment",
            Self::Rate => "rate",
            Self::Insurance => "insurance",
            Self::Balloon => "balloon",
            Self::Commission => "commission",
        };
        f.write_str(name)
    }
}

/// Errors raised while building or computing a quote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinancingError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: InputField, reason: String },
}

impl FinancingError {
    /// Rejects `field` with a human-readable reason.
    pub fn invalid(field: InputField, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// The field that failed validation.
    pub fn field(&self) -> InputField {
        match self {
            Self::InvalidInput { field, .. } => *field,
        }
    }

    /// Machine-readable kind of the failing field, e.g. `invalid_term`.
    pub fn kind(&self) -> &'static str {
        self.field().kind()
    }
}
