use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::facebook_integration::Entity")]
    FacebookIntegration,
    #[sea_orm(has_many = "super::pixel::Entity")]
    Pixels,
    #[sea_orm(has_many = "super::campaign::Entity")]
    Campaigns,
}

impl Related<super::facebook_integration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FacebookIntegration.def()
    }
}

impl Related<super::pixel::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pixels.def()
    }
}

impl Related<super::campaign::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaigns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
