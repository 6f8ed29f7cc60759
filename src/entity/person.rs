//! Person entity
//!
//! Table: people

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "people")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    pub title: Option<String>,

    pub avatar_url: Option<String>,

    /// Department id (not enforced as a foreign key, imports may be partial)
    pub department_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// Department names are joined by the store, see `directory::store`

impl ActiveModelBehavior for ActiveModel {}
