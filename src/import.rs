//! Content import job
//!
//! Replaces the departments and people tables with a snapshot of the content
//! API, fetched over GraphQL or read from a JSON file with the same payload.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{Config, ContentConfig, CONTENT_TOKEN_ENV};
use crate::db;
use crate::directory::Avatar;
use crate::entity::{department, person};

/// Rows per INSERT statement
const INSERT_BATCH: usize = 100;

/// Link to another record (`parent`, `department`)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RecordRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DepartmentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<RecordRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PersonRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub avatar: Option<Avatar>,
    #[serde(default)]
    pub department: Option<RecordRef>,
}

/// Content snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub all_departments: Vec<DepartmentRecord>,
    #[serde(default)]
    pub all_people: Vec<PersonRecord>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Snapshot>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    fn into_snapshot(self) -> anyhow::Result<Snapshot> {
        if !self.errors.is_empty() {
            let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
            anyhow::bail!("content API returned errors: {}", messages.join("; "));
        }
        self.data.context("content API response has no data")
    }
}

/// Where the snapshot comes from
#[derive(Debug, Clone)]
pub enum ImportSource {
    File(PathBuf),
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub departments: usize,
    pub people: usize,
}

fn graphql_query(page_size: u32) -> String {
    format!(
        "query {{
  allDepartments(first: {n}) {{ id name parent {{ id name }} }}
  allPeople(first: {n}) {{ id name title avatar {{ url }} department {{ id name }} }}
}}",
        n = page_size
    )
}

/// Fetch a snapshot from the content API
pub async fn fetch_snapshot(content: &ContentConfig) -> anyhow::Result<Snapshot> {
    if content.token.is_empty() {
        anyhow::bail!(
            "content API token is not set (content.token or {})",
            CONTENT_TOKEN_ENV
        );
    }

    info!("Fetching content snapshot from {}", content.endpoint);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let response: GraphQlResponse = client
        .post(&content.endpoint)
        .bearer_auth(&content.token)
        .json(&serde_json::json!({ "query": graphql_query(content.page_size) }))
        .send()
        .await
        .context("content API request failed")?
        .error_for_status()?
        .json()
        .await
        .context("invalid content API response")?;

    response.into_snapshot()
}

/// Read a snapshot from a JSON file, either bare or wrapped in a GraphQL
/// `{"data": ...}` envelope
pub fn load_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read snapshot {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;

    if value.get("data").is_some() || value.get("errors").is_some() {
        let envelope: GraphQlResponse = serde_json::from_value(value)?;
        envelope.into_snapshot()
    } else {
        Ok(serde_json::from_value(value)?)
    }
}

/// Keep one record per id: the last one, at the position of the first
fn last_write_wins<'a, T>(records: &'a [T], key: impl Fn(&'a T) -> &'a str) -> Vec<&'a T> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut kept: Vec<&T> = Vec::with_capacity(records.len());
    for record in records {
        match index.get(key(record)) {
            Some(&i) => kept[i] = record,
            None => {
                index.insert(key(record), kept.len());
                kept.push(record);
            }
        }
    }
    kept
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Replace both tables with the snapshot in one transaction
pub async fn write_snapshot(
    db: &DatabaseConnection,
    snapshot: &Snapshot,
) -> Result<ImportSummary, DbErr> {
    let departments = last_write_wins(&snapshot.all_departments, |d| d.id.as_str());
    let people = last_write_wins(&snapshot.all_people, |p| p.id.as_str());

    let txn = db.begin().await?;

    person::Entity::delete_many().exec(&txn).await?;
    department::Entity::delete_many().exec(&txn).await?;

    for chunk in departments.chunks(INSERT_BATCH) {
        let models = chunk.iter().map(|d| department::ActiveModel {
            id: Set(d.id.clone()),
            name: Set(d.name.clone()),
            parent_id: Set(non_blank(d.parent.as_ref().map(|p| p.id.as_str()))),
        });
        department::Entity::insert_many(models)
            .exec_without_returning(&txn)
            .await?;
    }

    for chunk in people.chunks(INSERT_BATCH) {
        let models = chunk.iter().map(|p| person::ActiveModel {
            id: Set(p.id.clone()),
            name: Set(p.name.clone()),
            title: Set(non_blank(p.title.as_deref())),
            avatar_url: Set(non_blank(p.avatar.as_ref().map(|a| a.url.as_str()))),
            department_id: Set(non_blank(p.department.as_ref().map(|d| d.id.as_str()))),
        });
        person::Entity::insert_many(models)
            .exec_without_returning(&txn)
            .await?;
    }

    txn.commit().await?;

    Ok(ImportSummary {
        departments: departments.len(),
        people: people.len(),
    })
}

/// Run the import job: obtain the snapshot, open the database, write, close.
pub async fn run_import(config: &Config, source: ImportSource) -> anyhow::Result<ImportSummary> {
    let snapshot = match source {
        ImportSource::File(path) => {
            info!("Loading content snapshot from {}", path.display());
            load_snapshot(&path)?
        }
        ImportSource::Remote => fetch_snapshot(&config.content).await?,
    };

    let conn = db::init_database(&config.database)
        .await
        .context("database initialization failed")?;
    let written = write_snapshot(&conn, &snapshot).await;
    conn.close().await.context("closing database failed")?;

    let summary = written.context("writing snapshot failed")?;
    info!(
        "Database created successfully with {} departments and {} people",
        summary.departments, summary.people
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::directory::{DepartmentForest, DepartmentRef, DirectoryStore, SeaOrmStore};
    use std::io::Write;

    const SNAPSHOT: &str = r#"{
        "allDepartments": [
            {"id": "2", "name": "Software", "parent": {"id": "1", "name": "Engineering"}},
            {"id": "1", "name": "Engineering", "parent": null},
            {"id": "3", "name": "Marketing"}
        ],
        "allPeople": [
            {"id": "p1", "name": "Ada Lovelace", "title": "Engineer", "avatar": {"url": "https://img/ada.png"}, "department": {"id": "2", "name": "Software"}},
            {"id": "p2", "name": "Grace Hopper", "title": null, "avatar": null, "department": null},
            {"id": "p1", "name": "Ada King", "title": "", "avatar": null, "department": {"id": "1", "name": "Engineering"}}
        ]
    }"#;

    fn snapshot() -> Snapshot {
        serde_json::from_str(SNAPSHOT).unwrap()
    }

    async fn memory_db() -> DatabaseConnection {
        db::init_database(&DatabaseConfig::in_memory()).await.unwrap()
    }

    #[test]
    fn test_parse_snapshot() {
        let snapshot = snapshot();
        assert_eq!(snapshot.all_departments.len(), 3);
        assert_eq!(snapshot.all_departments[2].parent, None);
        assert_eq!(snapshot.all_people[0].avatar.as_ref().map(|a| a.url.as_str()), Some("https://img/ada.png"));
    }

    #[test]
    fn test_last_write_wins_keeps_first_position() {
        let snapshot = snapshot();
        let people = last_write_wins(&snapshot.all_people, |p| p.id.as_str());
        let names: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ada King", "Grace Hopper"]);
    }

    #[test]
    fn test_graphql_errors_are_reported() {
        let envelope: GraphQlResponse =
            serde_json::from_str(r#"{"data": null, "errors": [{"message": "invalid token"}]}"#).unwrap();
        let err = envelope.into_snapshot().unwrap_err();
        assert!(err.to_string().contains("invalid token"));
    }

    #[test]
    fn test_graphql_query_uses_page_size() {
        let query = graphql_query(25);
        assert!(query.contains("allDepartments(first: 25)"));
        assert!(query.contains("allPeople(first: 25)"));
    }

    #[test]
    fn test_load_snapshot_bare_and_enveloped() {
        let mut bare = tempfile::NamedTempFile::new().unwrap();
        bare.write_all(SNAPSHOT.as_bytes()).unwrap();
        assert_eq!(load_snapshot(bare.path()).unwrap(), snapshot());

        let mut wrapped = tempfile::NamedTempFile::new().unwrap();
        write!(wrapped, "{{\"data\": {}}}", SNAPSHOT).unwrap();
        assert_eq!(load_snapshot(wrapped.path()).unwrap(), snapshot());
    }

    #[test]
    fn test_load_snapshot_missing_file() {
        assert!(load_snapshot(Path::new("/nonexistent/snapshot.json")).is_err());
    }

    #[tokio::test]
    async fn test_fetch_requires_token() {
        let err = fetch_snapshot(&ContentConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains(CONTENT_TOKEN_ENV));
    }

    #[tokio::test]
    async fn test_write_snapshot() {
        let conn = memory_db().await;
        let summary = write_snapshot(&conn, &snapshot()).await.unwrap();
        assert_eq!(summary, ImportSummary { departments: 3, people: 2 });

        let store = SeaOrmStore::new(conn, 100);
        let forest = DepartmentForest::build(&store.departments().await.unwrap());
        assert_eq!(
            forest.find_path("2"),
            vec![DepartmentRef::new("1", "Engineering"), DepartmentRef::new("2", "Software")]
        );

        let people = store.people().await.unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].name, "Ada King");
        assert_eq!(people[0].title, None);
        assert_eq!(people[0].department, Some(DepartmentRef::new("1", "Engineering")));
        assert_eq!(people[1].department, None);
    }

    #[tokio::test]
    async fn test_write_snapshot_replaces_previous_rows() {
        let conn = memory_db().await;
        tokio_test::assert_ok!(write_snapshot(&conn, &snapshot()).await);

        let smaller = Snapshot {
            all_departments: vec![DepartmentRecord {
                id: "9".to_string(),
                name: "Legal".to_string(),
                parent: None,
            }],
            all_people: Vec::new(),
        };
        let summary = write_snapshot(&conn, &smaller).await.unwrap();
        assert_eq!(summary, ImportSummary { departments: 1, people: 0 });

        let store = SeaOrmStore::new(conn, 100);
        assert_eq!(store.departments().await.unwrap().len(), 1);
        assert!(store.people().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_import_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot_path = dir.path().join("snapshot.json");
        std::fs::write(&snapshot_path, SNAPSHOT).unwrap();

        let mut config = Config::default();
        config.database.path = dir.path().join("humans.sqlite").display().to_string();

        let summary = run_import(&config, ImportSource::File(snapshot_path)).await.unwrap();
        assert_eq!(summary, ImportSummary { departments: 3, people: 2 });

        let conn = db::connect(&config.database).await.unwrap();
        let store = SeaOrmStore::new(conn, 100);
        assert_eq!(store.departments().await.unwrap().len(), 3);
    }
}
