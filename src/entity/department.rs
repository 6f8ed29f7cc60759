//! Department entity
//!
//! Table: departments

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::directory::DepartmentRow;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "departments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    /// Parent department id (NULL for top-level departments)
    pub parent_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// The self reference is resolved in memory by the department tree

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DepartmentRow {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            parent_id: model.parent_id,
        }
    }
}
