use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

/// Document uploaded to a church's shared folder
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChurchFile {
    pub id: i64,
    pub church_id: i64,
    pub file_name: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Study material published by a church
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EducationalResource {
    pub id: i64,
    pub church_id: i64,
    pub title: String,
    pub description: String,
    pub file_path: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Any stored record plus the public URL of its file
#[derive(Debug, Clone, Serialize)]
pub struct WithUrl<T: Serialize> {
    #[serde(flatten)]
    pub record: T,
    pub file_url: String,
}

const FILE_COLUMNS: &str = "id, church_id, file_name, file_path, uploaded_at";
const RESOURCE_COLUMNS: &str = "id, church_id, title, description, file_path, uploaded_at";

/// Church filter shared by both listings: `member_of` narrows to one profile's churches
const CHURCH_FILTER: &str = "(?1 IS NULL OR church_id IN (SELECT church_id FROM profile_churches WHERE profile_id = ?1))
               AND (?2 IS NULL OR church_id = ?2)";

impl ChurchFile {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<ChurchFile>, sqlx::Error> {
        sqlx::query_as::<_, ChurchFile>(&format!("SELECT {FILE_COLUMNS} FROM church_files WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &SqlitePool,
        member_of: Option<i64>,
        church_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<ChurchFile>, sqlx::Error> {
        sqlx::query_as::<_, ChurchFile>(&format!(
            "SELECT {FILE_COLUMNS} FROM church_files
             WHERE {CHURCH_FILTER}
             ORDER BY uploaded_at DESC, id DESC
             LIMIT ?3"
        ))
        .bind(member_of)
        .bind(church_id)
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO church_files (church_id, file_name, file_path, uploaded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(self.church_id)
        .bind(&self.file_name)
        .bind(&self.file_path)
        .bind(self.uploaded_at)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE church_files SET church_id = ?, file_name = ?, file_path = ? WHERE id = ?")
            .bind(self.church_id)
            .bind(&self.file_name)
            .bind(&self.file_path)
            .bind(self.id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM church_files WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl EducationalResource {
    pub async fn find(pool: &SqlitePool, id: i64) -> Result<Option<EducationalResource>, sqlx::Error> {
        sqlx::query_as::<_, EducationalResource>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM educational_resources WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &SqlitePool,
        member_of: Option<i64>,
        church_id: Option<i64>,
        limit: i64,
    ) -> Result<Vec<EducationalResource>, sqlx::Error> {
        sqlx::query_as::<_, EducationalResource>(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM educational_resources
             WHERE {CHURCH_FILTER}
             ORDER BY uploaded_at DESC, id DESC
             LIMIT ?3"
        ))
        .bind(member_of)
        .bind(church_id)
        .bind(if limit > 0 { limit } else { -1 })
        .fetch_all(pool)
        .await
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO educational_resources (church_id, title, description, file_path, uploaded_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(self.church_id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.file_path)
        .bind(self.uploaded_at)
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn save(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE educational_resources SET church_id = ?, title = ?, description = ?, file_path = ? WHERE id = ?",
        )
        .bind(self.church_id)
        .bind(&self.title)
        .bind(&self.description)
        .bind(&self.file_path)
        .bind(self.id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM educational_resources WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
