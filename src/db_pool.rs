use anyhow::Context;
use diesel::{ConnectionError, ConnectionResult};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::ManagerConfig;
use diesel_async::pooled_connection::deadpool::Pool;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use rustls::ClientConfig;
use rustls_platform_verifier::ConfigVerifierExt;

type PgManager = AsyncDieselConnectionManager<AsyncPgConnection>;

#[derive(Clone)]
pub struct DbPool(pub deadpool::managed::Pool<PgManager, deadpool::managed::Object<PgManager>>);

fn establish_connection(config: &str) -> BoxFuture<'_, ConnectionResult<AsyncPgConnection>> {
    let fut = async {
        let rustls_config = ClientConfig::with_platform_verifier()
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(rustls_config);
        let (client, conn) = tokio_postgres::connect(config, tls)
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;

        AsyncPgConnection::try_from_client_and_connection(client, conn).await
    };
    fut.boxed()
}

impl DbPool {
    pub async fn build(db_url: &str, pool_size: usize) -> anyhow::Result<Self> {
        let mut config = ManagerConfig::default();
        config.custom_setup = Box::new(establish_connection);

        let mgr = PgManager::new_with_config(db_url, config);
        let pool = Pool::builder(mgr)
            .max_size(pool_size)
            .build()
            .context("Could not build Postgres database connection pool.")?;

        // fail at startup rather than on the first request
        {
            use diesel_async::RunQueryDsl;
            diesel::sql_query("SELECT 1")
                .execute(&mut pool.get().await?)
                .await?;
        }

        tracing::info!(pool_size, "db pool initialized");

        Ok(DbPool(pool))
    }
}

#[cfg(test)]
static CRYPTO_INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

#[cfg(test)]
pub fn init_crypto_provider() {
    CRYPTO_INIT.get_or_init(|| {
        rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .expect("CryptoProvider already installed");
    });
}


#[cfg(test)]
mod tests {
    use super::{test_support::get_postgres_testcontainer, *};
    use crate::migrations::run_migrations;
    use diesel::prelude::QueryableByName;

    #[tokio::test]
    async fn test_migrations_create_tables() {
        init_crypto_provider();

        let (_db_container, dburl) = get_postgres_testcontainer().await;

        run_migrations(&dburl).unwrap();

        let pool = DbPool::build(&dburl, 1).await.unwrap();

        #[derive(QueryableByName, Debug)]
        struct Table {
            #[diesel(sql_type = diesel::sql_types::Text)]
            name: String,
        }

        let tables: Vec<Table> = {
            use diesel_async::RunQueryDsl;
            diesel::sql_query(
                "SELECT table_name::text AS name FROM information_schema.tables \
                 WHERE table_schema = 'public' AND table_name <> '__diesel_schema_migrations' \
                 ORDER BY table_name",
            )
            .load(&mut pool.0.get().await.unwrap())
            .await
            .unwrap()
        };

        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["bypass_logs", "clicks", "partners", "urls"]);
    }
}
