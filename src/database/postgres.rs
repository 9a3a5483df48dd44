use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::QueryAs;
use sqlx::PgPool;
use std::marker::PhantomData;
use uuid::Uuid;

use super::collection::{Collection, ListScope};
use super::manager::DatabaseError;
use crate::resources::Resource;

/// A column value to bind into generated SQL
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Text(Option<String>),
    Bool(bool),
    Int(i32),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

fn bind<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    column: Column,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    match column {
        Column::Text(v) => query.bind(v),
        Column::Bool(v) => query.bind(v),
        Column::Int(v) => query.bind(v),
        Column::Uuid(v) => query.bind(v),
        Column::Timestamp(v) => query.bind(v),
    }
}

/// Quote SQL identifier
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

const DISPLAY_ORDER: &str = r#"ORDER BY "order" ASC, "created_at" DESC"#;

/// Postgres-backed collection over `R::TABLE`
pub struct PgCollection<R> {
    pool: PgPool,
    _phantom: PhantomData<fn() -> R>,
}

impl<R: Resource> PgCollection<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: PhantomData,
        }
    }

    fn select_sql(scope: ListScope) -> String {
        let filter = match scope {
            ListScope::All => "",
            ListScope::Published => r#"WHERE "published" = true "#,
        };
        format!("SELECT * FROM {} {}{}", quote(R::TABLE), filter, DISPLAY_ORDER)
    }

    fn insert_sql(names: &[&str]) -> String {
        let columns: Vec<String> = names.iter().map(|n| quote(n)).collect();
        let params: Vec<String> = (1..=names.len()).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            quote(R::TABLE),
            columns.join(", "),
            params.join(", ")
        )
    }

    fn update_sql(names: &[&str]) -> String {
        let sets: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, n)| format!("{} = ${}", quote(n), i + 1))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE \"id\" = ${} RETURNING *",
            quote(R::TABLE),
            sets.join(", "),
            names.len() + 1
        )
    }
}

#[async_trait]
impl<R: Resource> Collection<R> for PgCollection<R> {
    async fn list(&self, scope: ListScope) -> Result<Vec<R::Record>, DatabaseError> {
        let sql = Self::select_sql(scope);
        let rows = sqlx::query_as::<_, R::Record>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn find(&self, id: Uuid) -> Result<Option<R::Record>, DatabaseError> {
        let sql = format!("SELECT * FROM {} WHERE \"id\" = $1", quote(R::TABLE));
        let row = sqlx::query_as::<_, R::Record>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert(&self, record: R::Record) -> Result<R::Record, DatabaseError> {
        let columns = R::columns(&record);
        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let sql = Self::insert_sql(&names);

        let mut query = sqlx::query_as::<_, R::Record>(&sql);
        for (_, value) in columns {
            query = bind(query, value);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn update(&self, id: Uuid, patch: R::Patch) -> Result<Option<R::Record>, DatabaseError> {
        let columns = R::patch_columns(&patch);
        if columns.is_empty() {
            return self.find(id).await;
        }

        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        let sql = Self::update_sql(&names);

        let mut query = sqlx::query_as::<_, R::Record>(&sql);
        for (_, value) in columns {
            query = bind(query, value);
        }
        Ok(query.bind(id).fetch_optional(&self.pool).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let sql = format!("DELETE FROM {} WHERE \"id\" = $1", quote(R::TABLE));
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::investor::Investor;

    #[test]
    fn builds_display_ordered_selects() {
        assert_eq!(
            PgCollection::<Investor>::select_sql(ListScope::Published),
            r#"SELECT * FROM "investors" WHERE "published" = true ORDER BY "order" ASC, "created_at" DESC"#
        );
        assert_eq!(
            PgCollection::<Investor>::select_sql(ListScope::All),
            r#"SELECT * FROM "investors" ORDER BY "order" ASC, "created_at" DESC"#
        );
    }

    #[test]
    fn builds_parameterised_writes() {
        assert_eq!(
            PgCollection::<Investor>::insert_sql(&["id", "order"]),
            r#"INSERT INTO "investors" ("id", "order") VALUES ($1, $2) RETURNING *"#
        );
        assert_eq!(
            PgCollection::<Investor>::update_sql(&["url", "published"]),
            r#"UPDATE "investors" SET "url" = $1, "published" = $2 WHERE "id" = $3 RETURNING *"#
        );
    }
}
