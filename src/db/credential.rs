/// Credential store: issued tokens and their revocation status
use crate::{
    credential::SignedToken,
    error::{VcError, VcResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::fmt;

/// Status of an issued credential
///
/// Anything other than `valid` is treated as not trusted. Unknown values
/// written by other tools are preserved as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    Valid,
    Revoked,
    Other(String),
}

impl CredentialStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "valid" => CredentialStatus::Valid,
            "revoked" => CredentialStatus::Revoked,
            other => CredentialStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CredentialStatus::Valid => "valid",
            CredentialStatus::Revoked => "revoked",
            CredentialStatus::Other(s) => s,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, CredentialStatus::Valid)
    }
}

impl fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CredentialStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Stored credential
#[derive(Debug, Clone, Serialize)]
pub struct CredentialRecord {
    pub jti: String,
    pub subject: String,
    pub token: SignedToken,
    pub issued_at: DateTime<Utc>,
    pub exp: i64,
    pub status: CredentialStatus,
    pub status_note: Option<String>,
    pub status_changed_at: Option<DateTime<Utc>>,
}

/// Credential persistence
///
/// The store is authoritative for revocation: a token id with no record is
/// never trusted.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Record a freshly signed credential with status `valid`
    async fn insert(
        &self,
        jti: &str,
        subject: &str,
        token: &SignedToken,
        exp: i64,
    ) -> VcResult<CredentialRecord>;

    async fn get(&self, jti: &str) -> VcResult<Option<CredentialRecord>>;

    /// Change the status; returns false when no record has this id
    async fn set_status(
        &self,
        jti: &str,
        status: &CredentialStatus,
        note: Option<&str>,
    ) -> VcResult<bool>;

    /// Newest first, optionally only for one subject
    async fn list(&self, subject: Option<&str>) -> VcResult<Vec<CredentialRecord>>;
}

/// SQLite-backed credential store
#[derive(Clone)]
pub struct SqliteCredentialStore {
    db: SqlitePool,
}

impl SqliteCredentialStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

const SELECT_COLUMNS: &str =
    "SELECT jti, subject, jwt, issued_at, exp, status, status_note, status_changed_at FROM credentials";

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn insert(
        &self,
        jti: &str,
        subject: &str,
        token: &SignedToken,
        exp: i64,
    ) -> VcResult<CredentialRecord> {
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO credentials (jti, subject, jwt, issued_at, exp, status)
            VALUES (?, ?, ?, ?, ?, 'valid')
            "#,
        )
        .bind(jti)
        .bind(subject)
        .bind(token.as_str())
        .bind(now.to_rfc3339())
        .bind(exp)
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                VcError::Conflict(format!("Credential {} already exists", jti))
            }
            other => VcError::Database(other),
        })?;

        Ok(CredentialRecord {
            jti: jti.to_string(),
            subject: subject.to_string(),
            token: token.clone(),
            issued_at: now,
            exp,
            status: CredentialStatus::Valid,
            status_note: None,
            status_changed_at: None,
        })
    }

    async fn get(&self, jti: &str) -> VcResult<Option<CredentialRecord>> {
        let row = sqlx::query(&format!("{} WHERE jti = ?", SELECT_COLUMNS))
            .bind(jti)
            .fetch_optional(&self.db)
            .await?;

        row.map(|row| record_from_row(&row)).transpose()
    }

    async fn set_status(
        &self,
        jti: &str,
        status: &CredentialStatus,
        note: Option<&str>,
    ) -> VcResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE credentials
            SET status = ?, status_note = ?, status_changed_at = ?
            WHERE jti = ?
            "#,
        )
        .bind(status.as_str())
        .bind(note)
        .bind(Utc::now().to_rfc3339())
        .bind(jti)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, subject: Option<&str>) -> VcResult<Vec<CredentialRecord>> {
        let rows = match subject {
            Some(subject) => {
                sqlx::query(&format!(
                    "{} WHERE subject = ? ORDER BY issued_at DESC, id DESC",
                    SELECT_COLUMNS
                ))
                .bind(subject)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query(&format!("{} ORDER BY issued_at DESC, id DESC", SELECT_COLUMNS))
                    .fetch_all(&self.db)
                    .await?
            }
        };

        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &SqliteRow) -> VcResult<CredentialRecord> {
    let issued_at_str: String = row.get("issued_at");
    let issued_at = DateTime::parse_from_rfc3339(&issued_at_str)
        .map_err(|e| VcError::Internal(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc);

    let status_changed_at = row
        .try_get::<Option<String>, _>("status_changed_at")
        .ok()
        .flatten()
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let status: String = row.get("status");
    let token: String = row.get("jwt");

    Ok(CredentialRecord {
        jti: row.get("jti"),
        subject: row.get("subject"),
        token: SignedToken::from(token),
        issued_at,
        exp: row.get("exp"),
        status: CredentialStatus::parse(&status),
        status_note: row.get("status_note"),
        status_changed_at,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, DatabaseOptions};
    use std::path::Path;

    pub(crate) async fn memory_store() -> SqliteCredentialStore {
        let pool = create_pool(Path::new(":memory:"), DatabaseOptions::default())
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteCredentialStore::new(pool)
    }

    fn token(s: &str) -> SignedToken {
        SignedToken::from(s.to_string())
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = memory_store().await;
        store
            .insert("vc-1", "did:example:alice", &token("a.b.c"), 1_900_000_000)
            .await
            .unwrap();

        let record = store.get("vc-1").await.unwrap().unwrap();
        assert_eq!(record.subject, "did:example:alice");
        assert_eq!(record.token.as_str(), "a.b.c");
        assert_eq!(record.exp, 1_900_000_000);
        assert_eq!(record.status, CredentialStatus::Valid);
        assert!(record.status_changed_at.is_none());

        assert!(store.get("vc-missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_jti_conflicts() {
        let store = memory_store().await;
        store.insert("vc-1", "s", &token("a.b.c"), 1).await.unwrap();

        let err = store.insert("vc-1", "s", &token("d.e.f"), 1).await.unwrap_err();
        assert!(matches!(err, VcError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_set_status() {
        let store = memory_store().await;
        store.insert("vc-1", "s", &token("a.b.c"), 1).await.unwrap();

        assert!(store
            .set_status("vc-1", &CredentialStatus::Revoked, Some("result overturned"))
            .await
            .unwrap());
        assert!(!store
            .set_status("vc-missing", &CredentialStatus::Revoked, None)
            .await
            .unwrap());

        let record = store.get("vc-1").await.unwrap().unwrap();
        assert_eq!(record.status, CredentialStatus::Revoked);
        assert_eq!(record.status_note.as_deref(), Some("result overturned"));
        assert!(record.status_changed_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_status_is_preserved() {
        let store = memory_store().await;
        store.insert("vc-1", "s", &token("a.b.c"), 1).await.unwrap();
        store
            .set_status("vc-1", &CredentialStatus::parse("suspended"), None)
            .await
            .unwrap();

        let record = store.get("vc-1").await.unwrap().unwrap();
        assert_eq!(record.status, CredentialStatus::Other("suspended".to_string()));
        assert!(!record.status.is_valid());
    }

    #[tokio::test]
    async fn test_list_filters_by_subject() {
        let store = memory_store().await;
        store.insert("vc-1", "did:example:alice", &token("a"), 1).await.unwrap();
        store.insert("vc-2", "did:example:bob", &token("b"), 1).await.unwrap();
        store.insert("vc-3", "did:example:alice", &token("c"), 1).await.unwrap();

        assert_eq!(store.list(None).await.unwrap().len(), 3);

        let alice: Vec<String> = store
            .list(Some("did:example:alice"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.jti)
            .collect();
        assert_eq!(alice.len(), 2);
        assert!(alice.contains(&"vc-1".to_string()));
        assert!(alice.contains(&"vc-3".to_string()));
    }

    #[test]
    fn test_status_serializes_as_string() {
        assert_eq!(
            serde_json::to_value(CredentialStatus::Revoked).unwrap(),
            serde_json::json!("revoked")
        );
    }
}
