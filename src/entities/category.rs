use sea_orm::entity::prelude::*;
use sea_orm::QueryFilter;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub is_active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product::Entity")]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Entity {
    pub fn find_active() -> Select<Entity> {
        Self::find().filter(Column::IsActive.eq(true))
    }

    pub fn find_active_by_id(id: i32) -> Select<Entity> {
        Self::find_by_id(id).filter(Column::IsActive.eq(true))
    }
}
