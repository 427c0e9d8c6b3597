//! 에너지 절감 인증서(CAE)와 정산 계산 모듈 모음.

pub mod billing;
pub mod cae;

pub use billing::{
    bill, BillingRates, BillingResult, BillingStrategy, CommercialBilling, Delegate,
    RegulatoryBilling,
};
pub use cae::{cae, CaeResult, SavingsError, SavingsInput};
