use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

use crate::error::Result;
use crate::job::{Job, JobStatus, NewJob};

/// Column a job selection can be sorted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Start,
    Priority,
}

impl SortField {
    fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Start => "start",
            SortField::Priority => "priority",
        }
    }
}

/// Sort specification for a job selection. Ascending unless descending is
/// requested explicitly.
#[derive(Debug, Clone, Copy)]
pub struct OrderBy {
    pub field: SortField,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            descending: false,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            descending: true,
        }
    }
}

/// Row limit for a job selection.
#[derive(Debug, Clone, Copy)]
pub enum LimitBy {
    /// First n rows
    First(u32),
    /// Rows [offset, offset + limit)
    Portion { offset: u32, limit: u32 },
}

impl LimitBy {
    fn offset_limit(self) -> (u32, u32) {
        match self {
            LimitBy::First(n) => (0, n),
            LimitBy::Portion { offset, limit } => (offset, limit),
        }
    }
}

impl From<u32> for LimitBy {
    fn from(n: u32) -> Self {
        LimitBy::First(n)
    }
}

/// SQLite-backed persistence for job records.
#[derive(Debug, Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

impl JobStore {
    /// Open (creating if missing) the database at `url` and ensure the job
    /// table exists.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS job ( \
                id INTEGER PRIMARY KEY AUTOINCREMENT, \
                start TEXT NOT NULL, \
                priority INTEGER NOT NULL DEFAULT 0, \
                command TEXT NOT NULL, \
                status TEXT NOT NULL DEFAULT 'a' CHECK (status IN ('a', 'r', 'd')), \
                created_on TEXT NOT NULL, \
                updated_on TEXT NOT NULL \
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_job_status_start ON job (status, start, priority)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new job, returning the stored record with its assigned id.
    pub async fn insert(&self, new: &NewJob) -> Result<Job> {
        let now = Local::now().naive_local();
        let job = sqlx::query_as::<_, Job>(
            "INSERT INTO job (start, priority, command, status, created_on, updated_on) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5) RETURNING *",
        )
        .bind(new.start)
        .bind(new.priority)
        .bind(&new.command)
        .bind(new.status)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(job)
    }

    pub async fn find(&self, id: i64) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM job WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    /// Set a job's status, touching `updated_on`.
    pub async fn update_status(&self, id: i64, status: JobStatus) -> Result<()> {
        sqlx::query("UPDATE job SET status = ?2, updated_on = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(Local::now().naive_local())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM job WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Select jobs with the given status, optionally restricted to those due
    /// at or before `maximum_start`, with caller-supplied ordering and
    /// pagination. Id ascending is always the final sort key, so equal-sort
    /// rows come back in insertion order.
    pub async fn select(
        &self,
        status: JobStatus,
        maximum_start: Option<NaiveDateTime>,
        orderby: Option<OrderBy>,
        limitby: Option<LimitBy>,
    ) -> Result<Vec<Job>> {
        let mut sql = String::from("SELECT * FROM job WHERE status = ?1");
        if maximum_start.is_some() {
            sql.push_str(" AND start <= ?2");
        }

        sql.push_str(" ORDER BY ");
        match orderby {
            Some(order) => {
                sql.push_str(order.field.column());
                sql.push_str(if order.descending { " DESC" } else { " ASC" });
                sql.push_str(", id ASC");
            }
            None => sql.push_str("id ASC"),
        }

        if let Some(limit) = limitby {
            let (offset, limit) = limit.offset_limit();
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        let mut query = sqlx::query_as::<_, Job>(&sql).bind(status);
        if let Some(cutoff) = maximum_start {
            query = query.bind(cutoff);
        }

        Ok(query.fetch_all(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_by_from_integer() {
        let (offset, limit) = LimitBy::from(5).offset_limit();
        assert_eq!((offset, limit), (0, 5));
    }

    #[test]
    fn limit_by_portion() {
        let (offset, limit) = LimitBy::Portion {
            offset: 10,
            limit: 20,
        }
        .offset_limit();
        assert_eq!((offset, limit), (10, 20));
    }

    #[test]
    fn order_by_direction() {
        assert!(!OrderBy::asc(SortField::Priority).descending);
        assert!(OrderBy::desc(SortField::Priority).descending);
    }
}
