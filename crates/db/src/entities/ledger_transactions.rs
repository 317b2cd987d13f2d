//! `SeaORM` Entity for ledger_transactions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{TransactionKind, TransactionStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub external_ref: Option<String>,
    #[sea_orm(unique)]
    pub deposit_id: Option<Uuid>,
    pub source_account_id: Option<Uuid>,
    pub destination_account_id: Option<Uuid>,
    pub amount_units: i64,
    pub fee_units: i64,
    pub status: TransactionStatus,
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::SourceAccountId",
        to = "super::accounts::Column::Id"
    )]
    SourceAccount,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::DestinationAccountId",
        to = "super::accounts::Column::Id"
    )]
    DestinationAccount,
    #[sea_orm(
        belongs_to = "super::deposit_requests::Entity",
        from = "Column::DepositId",
        to = "super::deposit_requests::Column::Id"
    )]
    DepositRequests,
}

impl Related<super::deposit_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DepositRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
