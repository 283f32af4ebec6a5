//! Repository for the `connection_profiles` table.

use sqlx::PgPool;
use lexiport_core::types::DbId;

use crate::models::profile::ConnectionProfile;

/// Column list for `connection_profiles` queries.
const COLUMNS: &str =
    "id, name, driver, host, port, database_name, username, password, created_at";

/// Read-only access to operator-seeded catalog connection profiles.
pub struct ProfileRepo;

impl ProfileRepo {
    /// Find a connection profile by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ConnectionProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM connection_profiles WHERE id = $1");
        sqlx::query_as::<_, ConnectionProfile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
