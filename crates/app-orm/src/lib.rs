//! sea-orm entities for the profile store.

pub mod prelude;
pub mod user_profiles;

use sea_orm::{ConnectionTrait, DbErr, Schema};

/// Creates every table this crate defines, skipping the ones that exist.
pub async fn create_tables<C>(db: &C) -> Result<(), DbErr>
where
    C: ConnectionTrait,
{
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut stmt = schema.create_table_from_entity(prelude::UserProfiles);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;

    tracing::info!("Ensured table {} exists", user_profiles::TABLE_NAME);

    Ok(())
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use super::*;

    #[tokio::test]
    async fn test_create_tables() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult { last_insert_id: 0, rows_affected: 0 }])
            .into_connection();

        create_tables(&db).await.unwrap();

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);

        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("CREATE TABLE IF NOT EXISTS"));
        assert!(sql.contains("user_profiles"));
        assert!(sql.contains("UNIQUE"));
    }
}
