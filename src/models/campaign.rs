use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// An ad campaign, keyed by the platform's campaign id and upserted on every
/// sync. Invariant: `cost_per_conversion` is spend / conversions when
/// conversions > 0, else 0.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: Uuid,
    pub name: String,
    pub pixel_id: String,
    #[sea_orm(column_type = "Double")]
    pub spend: f64,
    pub conversions: i64,
    #[sea_orm(column_type = "Double")]
    pub cost_per_conversion: f64,
    pub facebook_account_id: String,
    pub facebook_status: Option<String>,
    pub facebook_budget: Option<String>,
    pub facebook_objective: Option<String>,
    pub synced_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::pixel::Entity",
        from = "Column::PixelId",
        to = "super::pixel::Column::Id"
    )]
    Pixel,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::pixel::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pixel.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
