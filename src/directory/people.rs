//! People and the person filter
//!
//! The filter is a stable AND of independent predicates. Each predicate is a
//! no-op in its default state, so an empty filter keeps everyone.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::tree::DepartmentRef;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub url: String,
}

/// Person record as served to the page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Avatar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentRef>,
}

impl Person {
    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar
            .as_ref()
            .map(|a| a.url.as_str())
            .filter(|url| !url.trim().is_empty())
    }

    pub fn department_id(&self) -> Option<&str> {
        self.department.as_ref().map(|d| d.id.as_str())
    }
}

/// Reusable person filter
#[derive(Clone, Debug, Default)]
pub struct PersonFilter {
    /// Lowercased, trimmed; empty passes everyone
    name_query: String,
    /// Lowercased, trimmed substring of the department name
    department_name: String,
    hide_no_picture: bool,
    department_ids: HashSet<String>,
}

impl PersonFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring on the person's name
    pub fn name(mut self, query: &str) -> Self {
        self.name_query = query.trim().to_lowercase();
        self
    }

    /// Case-insensitive substring on the person's department name
    pub fn department_name(mut self, query: &str) -> Self {
        self.department_name = query.trim().to_lowercase();
        self
    }

    pub fn hide_no_picture(mut self, hide: bool) -> Self {
        self.hide_no_picture = hide;
        self
    }

    /// Restrict to the given department ids. An empty set applies no
    /// restriction.
    pub fn departments<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.department_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn matches(&self, person: &Person) -> bool {
        if !self.name_query.is_empty() && !person.name.to_lowercase().contains(&self.name_query) {
            return false;
        }

        if self.hide_no_picture && person.avatar_url().is_none() {
            return false;
        }

        if !self.department_name.is_empty() {
            let in_department = person
                .department
                .as_ref()
                .map(|d| d.name.to_lowercase().contains(&self.department_name))
                .unwrap_or(false);
            if !in_department {
                return false;
            }
        }

        if !self.department_ids.is_empty() {
            let allowed = person
                .department_id()
                .map(|id| self.department_ids.contains(id))
                .unwrap_or(false);
            if !allowed {
                return false;
            }
        }

        true
    }

    /// Matching people, in input order
    pub fn apply<'a>(&self, people: &'a [Person]) -> Vec<&'a Person> {
        people.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Filter people by name, picture presence and department membership.
///
/// `allowed_department_ids` of `None` or an empty set does not restrict by
/// department.
pub fn filter_people<'a>(
    people: &'a [Person],
    name_query: &str,
    hide_no_picture: bool,
    allowed_department_ids: Option<&HashSet<String>>,
) -> Vec<&'a Person> {
    let filter = PersonFilter::new()
        .name(name_query)
        .hide_no_picture(hide_no_picture)
        .departments(allowed_department_ids.into_iter().flatten().cloned());
    filter.apply(people)
}
