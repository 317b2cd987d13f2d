//! `SeaORM` Entity for accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub external_id: String,
    #[sea_orm(unique)]
    pub account_number: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub balance_units: i64,
    pub version: i64,
    pub is_admin: bool,
    pub created_at: DateTimeWithTimeZone,
    pub last_activity_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::deposit_requests::Entity")]
    DepositRequests,
}

impl Related<super::deposit_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DepositRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
