//! People handlers
//!
//! Implements the people search API and the people page state

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::directory::{DepartmentForest, DepartmentRef, Person, PersonFilter};
use crate::error::AppResult;
use crate::routes::ApiResponse;
use crate::state::AppState;

/// Path of the people page, used for permalinks
const PEOPLE_PAGE: &str = "/people";

/// Query parameters for the search API
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: String,
    /// Department name substring
    #[serde(default)]
    pub department: String,
    /// Comma-separated department ids
    #[serde(rename = "departmentIds", default)]
    pub department_ids: String,
    /// "required" hides people without an avatar
    #[serde(default)]
    pub avatar: String,
    #[serde(rename = "hasImage", default)]
    pub has_image: bool,
}

impl SearchQuery {
    fn requires_avatar(&self) -> bool {
        self.has_image || self.avatar == "required"
    }
}

/// Search API response
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Person>,
}

/// Query parameters for the people page
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub search: String,
    /// Selected department, by name (bookmark form)
    #[serde(default)]
    pub department: String,
    /// Selected department, by id (takes precedence over the name)
    #[serde(rename = "departmentId", default)]
    pub department_id: String,
    #[serde(rename = "hideNoPicture", default)]
    pub hide_no_picture: bool,
}

/// People page state
#[derive(Debug, Serialize)]
pub struct PeoplePage {
    pub departments: DepartmentForest,
    /// Root-first path to the selected department, empty when none
    #[serde(rename = "selectedPath")]
    pub selected_path: Vec<DepartmentRef>,
    pub people: Vec<Person>,
    /// Bookmarkable URL for the current search and department
    pub permalink: String,
}

/// GET /api/hashicorp
pub async fn search_people(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> (StatusCode, Json<SearchResponse>) {
    match run_search(&state, &query).await {
        Ok(results) => (StatusCode::OK, Json(SearchResponse { results })),
        Err(e) => {
            tracing::error!("People search failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SearchResponse { results: vec![] }),
            )
        }
    }
}

async fn run_search(state: &AppState, query: &SearchQuery) -> AppResult<Vec<Person>> {
    let people = if query.search.trim().is_empty() {
        state.store.people().await?
    } else {
        state.store.search_people(&query.search).await?
    };

    let filter = PersonFilter::new()
        .department_name(&query.department)
        .departments(parse_id_list(&query.department_ids))
        .hide_no_picture(query.requires_avatar());

    Ok(filter.apply(&people).into_iter().cloned().collect())
}

/// GET /api/people
pub async fn people_page(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<PeoplePage>>> {
    let forest = state.forest().await?;
    let everyone = state.store.people().await?;

    let selected_path = select_department(&forest, &query);
    let allowed = selected_path
        .last()
        .map(|d| forest.find_subtree(&d.id))
        .unwrap_or_default();

    let filter = PersonFilter::new()
        .name(&query.search)
        .hide_no_picture(query.hide_no_picture)
        .departments(allowed.into_iter().map(|d| d.id));
    let people = filter.apply(&everyone).into_iter().cloned().collect();

    let permalink = permalink(&query.search, selected_path.last().map(|d| d.name.as_str()));

    Ok(Json(ApiResponse::success(PeoplePage {
        departments: forest,
        selected_path,
        people,
        permalink,
    })))
}

/// Restore the selected department from the query, by id first, then by name
fn select_department(forest: &DepartmentForest, query: &PageQuery) -> Vec<DepartmentRef> {
    let id = query.department_id.trim();
    if !id.is_empty() {
        return forest.find_path(id);
    }

    let name = query.department.trim();
    if name.is_empty() {
        return Vec::new();
    }

    match forest.find_by_name(name) {
        Some(department) => forest.find_path(&department.id),
        None => {
            tracing::debug!("Unknown department in query: {}", name);
            Vec::new()
        }
    }
}

/// Split a comma-separated id list, dropping blanks
fn parse_id_list(ids: &str) -> Vec<String> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Page URL carrying the search term and selected department.
/// The picture toggle is not part of the bookmark.
fn permalink(search: &str, department: Option<&str>) -> String {
    let mut params = Vec::new();
    let search = search.trim();
    if !search.is_empty() {
        params.push(format!("search={}", urlencoding::encode(search)));
    }
    if let Some(department) = department {
        params.push(format!("department={}", urlencoding::encode(department)));
    }

    if params.is_empty() {
        PEOPLE_PAGE.to_string()
    } else {
        format!("{}?{}", PEOPLE_PAGE, params.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DepartmentRow;

    fn forest() -> DepartmentForest {
        DepartmentForest::build(&[
            DepartmentRow::new("1", "Engineering", None),
            DepartmentRow::new("2", "Software", Some("1")),
            DepartmentRow::new("3", "Hardware", Some("1")),
            DepartmentRow::new("4", "Marketing", None),
        ])
    }

    #[test]
    fn parse_id_list_drops_blanks() {
        assert_eq!(parse_id_list("1, 2,,3 ,"), vec!["1", "2", "3"]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn permalink_encodes_params() {
        assert_eq!(permalink("", None), "/people");
        assert_eq!(permalink(" Ada ", None), "/people?search=Ada");
        assert_eq!(
            permalink("Ada L", Some("R&D")),
            "/people?search=Ada%20L&department=R%26D"
        );
    }

    #[test]
    fn select_department_by_name() {
        let query = PageQuery {
            department: "software".to_string(),
            ..PageQuery::default()
        };
        let path = select_department(&forest(), &query);
        assert_eq!(
            path,
            vec![
                DepartmentRef::new("1", "Engineering"),
                DepartmentRef::new("2", "Software")
            ]
        );
    }

    #[test]
    fn select_department_id_wins_over_name() {
        let query = PageQuery {
            department: "Marketing".to_string(),
            department_id: "3".to_string(),
            ..PageQuery::default()
        };
        let path = select_department(&forest(), &query);
        assert_eq!(path.last().map(|d| d.id.as_str()), Some("3"));
    }

    #[test]
    fn select_department_unknown_or_blank() {
        let query = PageQuery {
            department: "Engine".to_string(),
            ..PageQuery::default()
        };
        assert!(select_department(&forest(), &query).is_empty());
        assert!(select_department(&forest(), &PageQuery::default()).is_empty());
    }

    #[test]
    fn search_query_avatar_flags() {
        let query = SearchQuery {
            avatar: "required".to_string(),
            ..SearchQuery::default()
        };
        assert!(query.requires_avatar());
        let query = SearchQuery {
            has_image: true,
            ..SearchQuery::default()
        };
        assert!(query.requires_avatar());
        assert!(!SearchQuery::default().requires_avatar());
    }
}
