//! Payment gateway seam.
//!
//! The HTTP client that talks to the gateway lives outside this repository.
//! The ledger only needs a funding instrument back for each deposit request.

use std::time::Duration;

use async_trait::async_trait;
use remit_shared::types::{Currency, DepositId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::ledger::LedgerError;

/// What the gateway is asked to fund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingRequest {
    /// Deposit being funded.
    pub deposit_id: DepositId,
    /// Amount to credit once paid.
    pub amount: Decimal,
    /// Currency the payer will send.
    pub currency: Currency,
    /// Payer reference shown in the gateway dashboard.
    pub buyer_reference: String,
}

/// What the gateway hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingInstrument {
    /// Gateway transaction id, echoed by later notifications.
    pub gateway_txn_id: String,
    /// Address the payer sends funds to.
    pub address: String,
    /// Hosted checkout page, if the gateway offers one.
    pub checkout_url: Option<String>,
    /// How long the address accepts payment.
    pub timeout: Duration,
}

/// Gateway failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The gateway answered with an error.
    #[error("gateway rejected the request: {0}")]
    Rejected(String),

    /// The gateway could not be reached.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

impl From<GatewayError> for LedgerError {
    fn from(err: GatewayError) -> Self {
        Self::Gateway(err.to_string())
    }
}

/// Creates funding instruments for deposit requests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Requests an address and transaction id for `request`.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the gateway rejects or cannot serve the request.
    async fn create_funding(
        &self,
        request: &FundingRequest,
    ) -> Result<FundingInstrument, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct FixedGateway;

    #[async_trait]
    impl PaymentGateway for FixedGateway {
        async fn create_funding(
            &self,
            request: &FundingRequest,
        ) -> Result<FundingInstrument, GatewayError> {
            if request.amount > dec!(1000) {
                return Err(GatewayError::Rejected("amount too large".to_string()));
            }
            Ok(FundingInstrument {
                gateway_txn_id: format!("CP-{}", request.deposit_id),
                address: "bc1qexample".to_string(),
                checkout_url: None,
                timeout: Duration::from_secs(3600),
            })
        }
    }

    fn request(amount: Decimal) -> FundingRequest {
        FundingRequest {
            deposit_id: DepositId::new(),
            amount,
            currency: Currency::Btc,
            buyer_reference: "42".to_string(),
        }
    }

    #[tokio::test]
    async fn test_gateway_trait_object() {
        let gateway: Box<dyn PaymentGateway> = Box::new(FixedGateway);
        let req = request(dec!(10));

        let instrument = gateway.create_funding(&req).await.unwrap();
        assert_eq!(instrument.gateway_txn_id, format!("CP-{}", req.deposit_id));
    }

    #[tokio::test]
    async fn test_gateway_error_becomes_ledger_error() {
        let err = FixedGateway
            .create_funding(&request(dec!(5000)))
            .await
            .unwrap_err();
        let ledger: LedgerError = err.into();
        assert_eq!(ledger.error_code(), "GATEWAY_ERROR");
    }
}
