use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One Facebook connection per user. `access_token` is stored encrypted
/// (AES-256-GCM, see utils::encryption); `ad_accounts` is the JSON list
/// returned by the Graph API at connection time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "facebook_integrations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub user_id: Uuid,
    pub facebook_user_id: String,
    pub facebook_user_name: Option<String>,
    pub facebook_user_email: Option<String>,
    pub access_token: String,
    pub token_expires_in: Option<i64>,
    pub ad_accounts: Json,
    pub connected_at: ChronoDateTimeUtc,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
