use crate::config::StartupError;
use crate::entities::capture_records;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use std::time::Duration;
use tracing::info;

pub async fn setup_database(db_url: &str) -> Result<DatabaseConnection, StartupError> {
    info!("📂 Metadata database: {}", redact(db_url));

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(20)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    info!("🔄 Ensuring capture_records table...");
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let stmt = schema
        .create_table_from_entity(capture_records::Entity)
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&stmt)).await?;

    Ok(())
}

/// Hides the password part of a connection URL for logging.
fn redact(db_url: &str) -> String {
    match (db_url.find("://"), db_url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let userinfo = &db_url[scheme_end + 3..at];
            match userinfo.split_once(':') {
                Some((user, _)) => format!("{}{}:***{}", &db_url[..scheme_end + 3], user, &db_url[at..]),
                None => db_url.to_string(),
            }
        }
        _ => db_url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("postgres://relay:hunter2@db:5432/captures"),
            "postgres://relay:***@db:5432/captures"
        );
        assert_eq!(redact("sqlite://relay.db?mode=rwc"), "sqlite://relay.db?mode=rwc");
        assert_eq!(redact("postgres://relay@db/captures"), "postgres://relay@db/captures");
    }
}
