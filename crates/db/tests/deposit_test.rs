//! Integration tests for deposit reconciliation.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::Harness;
use remit_core::account::Account;
use remit_core::deposit::{
    DepositConfirmation, DepositRequest, DepositStatus, FundingInstrument, FundingRequest,
    GatewayError, GatewayStatus, GatewayUpdate, PaymentGateway,
};
use remit_core::ledger::{Counterparty, LedgerError, TransactionKind};
use remit_shared::types::{AccountId, Currency};
use remit_db::entities::{deposit_requests, sea_orm_active_enums as db};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

/// Hands out sequential gateway transaction ids.
#[derive(Default)]
struct StubGateway {
    issued: AtomicU32,
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_funding(
        &self,
        request: &FundingRequest,
    ) -> Result<FundingInstrument, GatewayError> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FundingInstrument {
            gateway_txn_id: format!("CP{n:04}"),
            address: format!("addr-{}", request.buyer_reference),
            checkout_url: Some(format!("https://pay.example/{n}")),
            timeout: Duration::from_secs(3600),
        })
    }
}

struct DownGateway;

#[async_trait]
impl PaymentGateway for DownGateway {
    async fn create_funding(&self, _: &FundingRequest) -> Result<FundingInstrument, GatewayError> {
        Err(GatewayError::Unavailable("connection reset".to_string()))
    }
}

/// Issues the same gateway transaction id for every request.
struct RepeatingGateway;

#[async_trait]
impl PaymentGateway for RepeatingGateway {
    async fn create_funding(&self, _: &FundingRequest) -> Result<FundingInstrument, GatewayError> {
        Ok(FundingInstrument {
            gateway_txn_id: "CP0001".to_string(),
            address: "addr-shared".to_string(),
            checkout_url: None,
            timeout: Duration::from_secs(60),
        })
    }
}

async fn requested(h: &Harness, owner: &Account, amount: Decimal) -> DepositRequest {
    h.deposits
        .request_deposit(owner.id, amount, Currency::Btc, &StubGateway::default())
        .await
        .expect("deposit request should succeed")
}

#[tokio::test]
async fn test_request_deposit_stores_instrument() {
    let h = Harness::new().await;
    let alice = h.account("alice").await;

    let deposit = requested(&h, &alice, dec!(0.5)).await;

    assert_eq!(deposit.status, DepositStatus::Pending);
    assert_eq!(deposit.account_id, alice.id);
    assert_eq!(deposit.amount, dec!(0.5));
    assert_eq!(deposit.currency, Currency::Btc);
    assert_eq!(deposit.gateway_txn_id.as_deref(), Some("CP0001"));
    assert_eq!(deposit.address.as_deref(), Some("addr-alice"));
    assert!(deposit.confirmed_at.is_none());
    assert_eq!(
        deposit.expires_at,
        Some(deposit.created_at + chrono::TimeDelta::seconds(3600))
    );

    let pending = h.deposits.pending_for_account(alice.id).await.expect("pending");
    assert_eq!(pending, vec![deposit]);
}

#[tokio::test]
async fn test_request_deposit_validation() {
    let h = Harness::new().await;
    let alice = h.account("alice").await;
    let gateway = StubGateway::default();

    let err = h
        .deposits
        .request_deposit(alice.id, dec!(0), Currency::Eth, &gateway)
        .await
        .expect_err("zero amount should fail");
    assert!(matches!(err, LedgerError::InvalidAmount(_)));

    let err = h
        .deposits
        .request_deposit(AccountId::new(), dec!(1), Currency::Eth, &gateway)
        .await
        .expect_err("unknown account should fail");
    assert!(matches!(err, LedgerError::TargetNotFound(_)));
    assert_eq!(gateway.issued.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_gateway_failure_marks_request_failed() {
    let h = Harness::new().await;
    let alice = h.account("alice").await;

    let err = h
        .deposits
        .request_deposit(alice.id, dec!(1), Currency::Ltc, &DownGateway)
        .await
        .expect_err("gateway failure should surface");
    assert!(matches!(err, LedgerError::Gateway(_)));

    let pending = h.deposits.pending_for_account(alice.id).await.expect("pending");
    assert!(pending.is_empty());
    let stats = h.reports.system_stats().await.expect("stats");
    assert_eq!(stats.pending_deposits, 0);
}

#[tokio::test]
async fn test_unrecorded_instrument_leaves_request_unlinked() {
    let h = Harness::new().await;
    let alice = h.account("alice").await;
    let linked = h
        .deposits
        .request_deposit(alice.id, dec!(1), Currency::Btc, &RepeatingGateway)
        .await
        .expect("first request should succeed");

    // The second instrument reuses a recorded txn id, so storing it fails.
    let err = h
        .deposits
        .request_deposit(alice.id, dec!(2), Currency::Btc, &RepeatingGateway)
        .await
        .expect_err("duplicate instrument should not be recorded");
    assert!(matches!(err, LedgerError::StorageUnavailable(_)));

    let pending = h.deposits.pending_for_account(alice.id).await.expect("pending");
    assert_eq!(pending.len(), 2);
    let orphan = pending
        .iter()
        .find(|deposit| deposit.id != linked.id)
        .expect("unlinked request");
    assert_eq!(orphan.status, DepositStatus::Pending);
    assert!(orphan.gateway_txn_id.is_none());
    assert!(orphan.expires_at.is_none());

    let found = h
        .deposits
        .find_by_gateway_txn_id("CP0001")
        .await
        .expect("lookup")
        .expect("linked request");
    assert_eq!(found.id, linked.id);
}

#[tokio::test]
async fn test_confirm_credits_exactly_once() {
    let h = Harness::new().await;
    let alice = h.account("alice").await;
    let deposit = requested(&h, &alice, dec!(0.25)).await;
    let txn_id = deposit.gateway_txn_id.clone().expect("txn id");

    let first = h.deposits.confirm(&txn_id).await.expect("confirm should succeed");
    let DepositConfirmation::Credited {
        deposit: confirmed,
        transaction,
        account,
    } = first
    else {
        panic!("first confirmation should credit");
    };
    assert_eq!(confirmed.status, DepositStatus::Completed);
    assert!(confirmed.confirmed_at.is_some());
    assert_eq!(transaction.kind, TransactionKind::Deposit);
    assert_eq!(transaction.source, Counterparty::System);
    assert_eq!(transaction.destination, Counterparty::Account(alice.id));
    assert_eq!(transaction.external_ref.as_deref(), Some(txn_id.as_str()));
    assert_eq!(transaction.deposit_id, Some(deposit.id));
    assert_eq!(transaction.fee, dec!(0));
    assert_eq!(account.balance, dec!(0.25));

    let second = h.deposits.confirm(&txn_id).await.expect("duplicate is benign");
    assert_eq!(
        second,
        DepositConfirmation::AlreadyProcessed {
            gateway_txn_id: txn_id.clone()
        }
    );

    assert_eq!(h.balance("alice").await, dec!(0.25));
    let history = h.reports.history(alice.id, None).await.expect("history");
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_racing_confirmations_credit_once() {
    let h = Harness::new().await;
    let alice = h.account("alice").await;
    let deposit = requested(&h, &alice, dec!(3)).await;
    let txn_id = deposit.gateway_txn_id.expect("txn id");

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let deposits = h.deposits.clone();
            let txn_id = txn_id.clone();
            tokio::spawn(async move { deposits.confirm(&txn_id).await })
        })
        .collect();

    let mut credited = 0;
    for result in futures::future::join_all(handles).await {
        if result.expect("task panicked").expect("confirm should succeed").is_credited() {
            credited += 1;
        }
    }

    assert_eq!(credited, 1);
    assert_eq!(h.balance("alice").await, dec!(3));
}

#[tokio::test]
async fn test_confirm_unknown_deposit() {
    let h = Harness::new().await;
    let err = h.deposits.confirm("CP9999").await.expect_err("unknown deposit");
    assert_eq!(err, LedgerError::UnknownDeposit("CP9999".to_string()));
}

#[tokio::test]
async fn test_failed_deposit_cannot_be_confirmed() {
    let h = Harness::new().await;
    let alice = h.account("alice").await;
    let deposit = requested(&h, &alice, dec!(1)).await;
    let txn_id = deposit.gateway_txn_id.expect("txn id");

    let failed = h.deposits.mark_failed(&txn_id).await.expect("mark failed");
    assert_eq!(failed.status, DepositStatus::Failed);

    // Marking twice is harmless.
    let again = h.deposits.mark_failed(&txn_id).await.expect("mark failed again");
    assert_eq!(again.status, DepositStatus::Failed);

    let err = h.deposits.confirm(&txn_id).await.expect_err("failed is terminal");
    assert_eq!(err, LedgerError::DepositNotConfirmable(txn_id));
    assert_eq!(h.balance("alice").await, dec!(0));
}

#[tokio::test]
async fn test_completed_deposit_cannot_fail() {
    let h = Harness::new().await;
    let alice = h.account("alice").await;
    let deposit = requested(&h, &alice, dec!(1)).await;
    let txn_id = deposit.gateway_txn_id.expect("txn id");

    h.deposits.confirm(&txn_id).await.expect("confirm");
    let err = h.deposits.mark_failed(&txn_id).await.expect_err("already credited");
    assert!(err.is_benign());
    assert_eq!(h.balance("alice").await, dec!(1));
}

#[tokio::test]
async fn test_externally_confirmed_deposit_is_still_open() {
    let h = Harness::new().await;
    let alice = h.account("alice").await;
    let deposit = requested(&h, &alice, dec!(3)).await;
    let txn_id = deposit.gateway_txn_id.clone().expect("txn id");

    // An operator marks the request paid without crediting it.
    deposit_requests::Entity::update_many()
        .col_expr(
            deposit_requests::Column::Status,
            Expr::value(db::DepositStatus::Confirmed),
        )
        .filter(deposit_requests::Column::Id.eq(deposit.id.into_inner()))
        .exec(&h.db)
        .await
        .expect("external status write");

    let pending = h.deposits.pending_for_account(alice.id).await.expect("pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, DepositStatus::Confirmed);

    let confirmation = h.deposits.confirm(&txn_id).await.expect("confirm");
    assert!(confirmation.is_credited());
    assert_eq!(h.balance("alice").await, dec!(3));
}

#[tokio::test]
async fn test_apply_gateway_status_dispatch() {
    let h = Harness::new().await;
    let alice = h.account("alice").await;
    let first = requested(&h, &alice, dec!(2)).await;
    let second = requested(&h, &alice, dec!(4)).await;
    let first_id = first.gateway_txn_id.clone().expect("txn id");
    let second_id = second.gateway_txn_id.clone().expect("txn id");

    let update = h
        .deposits
        .apply_gateway_status(&first_id, GatewayStatus::Pending)
        .await
        .expect("pending is a no-op");
    assert_eq!(update, GatewayUpdate::Pending(first));

    let update = h
        .deposits
        .apply_gateway_status(&first_id, GatewayStatus::from_code(100))
        .await
        .expect("complete confirms");
    assert!(matches!(update, GatewayUpdate::Confirmed(c) if c.is_credited()));

    let update = h
        .deposits
        .apply_gateway_status(&second_id, GatewayStatus::from_code(-1))
        .await
        .expect("failed marks failed");
    assert!(matches!(update, GatewayUpdate::Failed(d) if d.status == DepositStatus::Failed));

    let err = h
        .deposits
        .apply_gateway_status("CP9999", GatewayStatus::Pending)
        .await
        .expect_err("unknown deposit");
    assert!(matches!(err, LedgerError::UnknownDeposit(_)));

    assert_eq!(h.balance("alice").await, dec!(2));
    let stored = h
        .deposits
        .find_by_gateway_txn_id(&second_id)
        .await
        .expect("lookup")
        .expect("deposit should exist");
    assert_eq!(stored.status, DepositStatus::Failed);
}
