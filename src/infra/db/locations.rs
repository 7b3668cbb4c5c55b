use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{LocationParams, LocationsRepo, LocationsWriteRepo, RepoError};
use crate::domain::entities::LocationRecord;

use super::PostgresRepositories;
use super::util::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct LocationRow {
    id: Uuid,
    name: String,
    is_published: bool,
    created_at: OffsetDateTime,
}

impl From<LocationRow> for LocationRecord {
    fn from(row: LocationRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            is_published: row.is_published,
            created_at: row.created_at,
        }
    }
}

const LOCATION_COLUMNS: &str = "id, name, is_published, created_at";

#[async_trait]
impl LocationsRepo for PostgresRepositories {
    async fn find_location(&self, id: Uuid) -> Result<Option<LocationRecord>, RepoError> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = $1");
        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(LocationRecord::from))
    }

    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations ORDER BY LOWER(name)");
        let rows = sqlx::query_as::<_, LocationRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(LocationRecord::from).collect())
    }
}

#[async_trait]
impl LocationsWriteRepo for PostgresRepositories {
    async fn create_location(&self, params: LocationParams) -> Result<LocationRecord, RepoError> {
        let sql = format!(
            "INSERT INTO locations (name, is_published) VALUES ($1, $2) \
             RETURNING {LOCATION_COLUMNS}"
        );

        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(&params.name)
            .bind(params.is_published)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(LocationRecord::from(row))
    }

    async fn update_location(
        &self,
        id: Uuid,
        params: LocationParams,
    ) -> Result<LocationRecord, RepoError> {
        let sql = format!(
            "UPDATE locations SET name = $1, is_published = $2 WHERE id = $3 \
             RETURNING {LOCATION_COLUMNS}"
        );

        let row = sqlx::query_as::<_, LocationRow>(&sql)
            .bind(&params.name)
            .bind(params.is_published)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)?;

        Ok(LocationRecord::from(row))
    }

    async fn set_location_published(&self, id: Uuid, published: bool) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE locations SET is_published = $1 WHERE id = $2")
            .bind(published)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
