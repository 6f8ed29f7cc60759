//! Data access for the directory
//!
//! `DirectoryStore` is the seam between the HTTP layer and storage. Every
//! call returns a complete snapshot; nothing is streamed or patched.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

use super::people::{Avatar, Person};
use super::tree::{DepartmentRef, DepartmentRow};
use crate::entity::{department, person};

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// All departments, ordered by name
    async fn departments(&self) -> Result<Vec<DepartmentRow>, DbErr>;

    /// All people, ordered by name
    async fn people(&self) -> Result<Vec<Person>, DbErr>;

    /// People whose name contains `term`, ordered by name. A blank term
    /// yields nothing.
    async fn search_people(&self, term: &str) -> Result<Vec<Person>, DbErr>;
}

/// SeaORM backed store
///
/// Borrows the pool handed in by the caller; it never opens connections of
/// its own.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
    search_limit: u64,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection, search_limit: u64) -> Self {
        Self { db, search_limit }
    }

    async fn department_names(&self) -> Result<HashMap<String, String>, DbErr> {
        let rows = department::Entity::find().all(&self.db).await?;
        Ok(rows.into_iter().map(|d| (d.id, d.name)).collect())
    }
}

#[async_trait]
impl DirectoryStore for SeaOrmStore {
    async fn departments(&self) -> Result<Vec<DepartmentRow>, DbErr> {
        let rows = department::Entity::find()
            .order_by_asc(department::Column::Name)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(DepartmentRow::from)
            .map(|mut row| {
                row.name = row.name.trim().to_string();
                row
            })
            .collect())
    }

    async fn people(&self) -> Result<Vec<Person>, DbErr> {
        let names = self.department_names().await?;
        let rows = person::Entity::find()
            .order_by_asc(person::Column::Name)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().filter_map(|row| to_person(row, &names)).collect())
    }

    async fn search_people(&self, term: &str) -> Result<Vec<Person>, DbErr> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let names = self.department_names().await?;
        let rows = person::Entity::find()
            .filter(name_contains(term))
            .order_by_asc(person::Column::Name)
            .limit(self.search_limit)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().filter_map(|row| to_person(row, &names)).collect())
    }
}

/// Case-insensitive substring match on the person name. Plain `LIKE` only
/// ignores case on SQLite.
fn name_contains(term: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((person::Entity, person::Column::Name))))
        .like(format!("%{}%", term.to_lowercase()))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalise a stored row: values are trimmed, blanks dropped, and the
/// department kept only when it resolves to a named department.
fn to_person(row: person::Model, department_names: &HashMap<String, String>) -> Option<Person> {
    let id = non_blank(Some(row.id.as_str()))?;

    let department = row.department_id.as_deref().and_then(|dept_id| {
        let name = non_blank(department_names.get(dept_id).map(String::as_str))?;
        Some(DepartmentRef::new(dept_id, name))
    });

    Some(Person {
        id,
        name: non_blank(Some(row.name.as_str())).unwrap_or_default(),
        title: non_blank(row.title.as_deref()),
        avatar: non_blank(row.avatar_url.as_deref()).map(|url| Avatar { url }),
        department,
    })
}

/// In-memory store for handler tests
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    pub departments: Vec<DepartmentRow>,
    pub people: Vec<Person>,
    pub fail: bool,
}

#[cfg(test)]
#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn departments(&self) -> Result<Vec<DepartmentRow>, DbErr> {
        if self.fail {
            return Err(DbErr::Custom("store unavailable".to_string()));
        }
        Ok(self.departments.clone())
    }

    async fn people(&self) -> Result<Vec<Person>, DbErr> {
        if self.fail {
            return Err(DbErr::Custom("store unavailable".to_string()));
        }
        Ok(self.people.clone())
    }

    async fn search_people(&self, term: &str) -> Result<Vec<Person>, DbErr> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let people = self.people().await?;
        Ok(people
            .into_iter()
            .filter(|p| p.name.to_lowercase().contains(&term))
            .collect())
    }
}
