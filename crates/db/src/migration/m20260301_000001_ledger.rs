//! Migration to create the ledger tables: accounts, deposit requests and
//! ledger transactions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::ExternalId).string_len(64).not_null())
                    .col(ColumnDef::new(Accounts::AccountNumber).string_len(34).not_null())
                    .col(ColumnDef::new(Accounts::Username).string_len(255).null())
                    .col(ColumnDef::new(Accounts::FirstName).string_len(255).null())
                    .col(ColumnDef::new(Accounts::LastName).string_len(255).null())
                    .col(
                        ColumnDef::new(Accounts::BalanceUnits)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Accounts::BalanceUnits).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Accounts::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Accounts::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Accounts::LastActivityAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_accounts_external_id")
                    .table(Accounts::Table)
                    .col(Accounts::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_accounts_account_number")
                    .table(Accounts::Table)
                    .col(Accounts::AccountNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_created_at")
                    .table(Accounts::Table)
                    .col(Accounts::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DepositRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DepositRequests::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DepositRequests::GatewayTxnId).string_len(128).null())
                    .col(ColumnDef::new(DepositRequests::AccountId).uuid().not_null())
                    .col(
                        ColumnDef::new(DepositRequests::AmountUnits)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(DepositRequests::AmountUnits).gt(0)),
                    )
                    .col(ColumnDef::new(DepositRequests::Currency).string_len(8).not_null())
                    .col(ColumnDef::new(DepositRequests::Address).string_len(255).null())
                    .col(ColumnDef::new(DepositRequests::CheckoutUrl).text().null())
                    .col(
                        ColumnDef::new(DepositRequests::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(DepositRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DepositRequests::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DepositRequests::ConfirmedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deposit_requests_account")
                            .from(DepositRequests::Table, DepositRequests::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_deposit_requests_gateway_txn_id")
                    .table(DepositRequests::Table)
                    .col(DepositRequests::GatewayTxnId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deposit_requests_account")
                    .table(DepositRequests::Table)
                    .col(DepositRequests::AccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deposit_requests_status")
                    .table(DepositRequests::Table)
                    .col(DepositRequests::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LedgerTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerTransactions::ExternalRef).string_len(128).null())
                    .col(ColumnDef::new(LedgerTransactions::DepositId).uuid().null())
                    .col(ColumnDef::new(LedgerTransactions::SourceAccountId).uuid().null())
                    .col(
                        ColumnDef::new(LedgerTransactions::DestinationAccountId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::AmountUnits)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(LedgerTransactions::AmountUnits).gt(0)),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::FeeUnits)
                            .big_integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(LedgerTransactions::FeeUnits).gte(0)),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerTransactions::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(LedgerTransactions::Description).text().null())
                    .col(
                        ColumnDef::new(LedgerTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_transactions_source")
                            .from(LedgerTransactions::Table, LedgerTransactions::SourceAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_transactions_destination")
                            .from(
                                LedgerTransactions::Table,
                                LedgerTransactions::DestinationAccountId,
                            )
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_transactions_deposit")
                            .from(LedgerTransactions::Table, LedgerTransactions::DepositId)
                            .to(DepositRequests::Table, DepositRequests::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one ledger transaction per deposit request
        manager
            .create_index(
                Index::create()
                    .name("uq_ledger_transactions_deposit_id")
                    .table(LedgerTransactions::Table)
                    .col(LedgerTransactions::DepositId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_ledger_transactions_external_ref")
                    .table(LedgerTransactions::Table)
                    .col(LedgerTransactions::ExternalRef)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_transactions_source_created")
                    .table(LedgerTransactions::Table)
                    .col(LedgerTransactions::SourceAccountId)
                    .col(LedgerTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_transactions_destination_created")
                    .table(LedgerTransactions::Table)
                    .col(LedgerTransactions::DestinationAccountId)
                    .col(LedgerTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_transactions_created_at")
                    .table(LedgerTransactions::Table)
                    .col(LedgerTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LedgerTransactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DepositRequests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    ExternalId,
    AccountNumber,
    Username,
    FirstName,
    LastName,
    BalanceUnits,
    Version,
    IsAdmin,
    CreatedAt,
    LastActivityAt,
}

#[derive(DeriveIden)]
enum DepositRequests {
    Table,
    Id,
    GatewayTxnId,
    AccountId,
    AmountUnits,
    Currency,
    Address,
    CheckoutUrl,
    Status,
    CreatedAt,
    ExpiresAt,
    ConfirmedAt,
}

#[derive(DeriveIden)]
enum LedgerTransactions {
    Table,
    Id,
    ExternalRef,
    DepositId,
    SourceAccountId,
    DestinationAccountId,
    AmountUnits,
    FeeUnits,
    Status,
    Kind,
    Description,
    CreatedAt,
    CompletedAt,
}
