//! `rd_financing` is a Rust library for quoting vehicle financing at Dominican dealerships.
//!
//! Given the vehicle price and the loan terms it computes:
//! - **Principal financed**: price minus down payment and balloon.
//! - **Level monthly payment**: the annuity (Price table) installment, plus insurance,
//!   the prorated financing commission and, optionally, ITBIS on that commission.
//! - **Amortization schedule**: the interest/principal split and remaining balance of
//!   every installment.
//! - **Totals**: interest, insurance, commission and the overall cost of the vehicle.
//!
//! ## Usage
//!
//! Add `rd_financing` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rd_financing = "0.1.0"
//! rust_decimal = "1.39.0"
//! rust_decimal_macros = "1.39.0"
//! ```
//!
//! Then build a [`FinancingInput`] and call [`compute`]:
//!
//! ```rust
//! use rd_financing::{compute, format_currency, Commission, FinancingInput};
//! use rust_decimal_macros::dec;
//!
//! fn main() {
//!     let input = FinancingInput::for_price(dec!(1_000_000))
//!         .with_down_payment_percent(dec!(20))
//!         .with_term(24)
//!         .with_annual_rate(dec!(22))
//!         .with_commission(Commission::Percent(dec!(1)))
//!         .with_insurance(dec!(9000));
//!
//!     match compute(&input) {
//!         Ok(result) => {
//!             println!("Monthly payment: {}", format_currency(result.monthly_payment));
//!             println!("Total interest:  {}", format_currency(result.total_interest));
//!             println!("Total cost:      {}", format_currency(result.total_cost));
//!         }
//!         Err(e) => {
//!             eprintln!("Error calculating financing: {}", e);
//!         }
//!     }
//! }
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod presentation;

pub use engine::{AmortizationRow, FinancingResult, compute, level_payment, monthly_rate};
pub use error::{FinancingError, InputField};
pub use input::{Commission, DownPayment, FinancingDefaults, FinancingInput};
pub use presentation::{format_currency, format_percent};
