use async_trait::async_trait;
use diesel::sql_types;

use crate::{
    db::LinksDB,
    db_pool::DbPool,
    models::{
        BypassStat, CountryStat, DeviceStat, FetchClick, FetchPartner, FetchUrl,
        FetchUrlWithPartner, NewPartner, NewUrl, UrlChanges,
    },
    schema,
};

#[derive(Clone)]
pub struct PostgresDb {
    db: DbPool,
}

impl PostgresDb {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LinksDB for PostgresDb {
    async fn list_urls(&self) -> Result<Vec<FetchUrlWithPartner>, super::DbError> {
        use diesel::{ExpressionMethods, NullableExpressionMethods, QueryDsl, SelectableHelper};
        use diesel_async::RunQueryDsl;

        let rows: Vec<(FetchUrl, Option<(String, String)>)> = schema::urls::table
            .left_join(schema::partners::table)
            .order(schema::urls::created.desc())
            .select((
                FetchUrl::as_select(),
                (schema::partners::name, schema::partners::domain).nullable(),
            ))
            .load(&mut self.db.0.get().await?)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(url, partner)| FetchUrlWithPartner { url, partner })
            .collect())
    }

    async fn url_exists(&self, code: &str) -> Result<bool, super::DbError> {
        use diesel::{ExpressionMethods, QueryDsl, dsl::exists, select};
        use diesel_async::RunQueryDsl;

        Ok(select(exists(
            schema::urls::table.filter(schema::urls::code.eq(code)),
        ))
        .get_result(&mut self.db.0.get().await?)
        .await?)
    }

    async fn create_url(&self, url: &NewUrl) -> Result<FetchUrl, super::DbError> {
        use diesel::SelectableHelper;
        use diesel_async::RunQueryDsl;

        Ok(diesel::insert_into(schema::urls::table)
            .values(url)
            .returning(FetchUrl::as_returning())
            .get_result(&mut self.db.0.get().await?)
            .await?)
    }

    async fn update_url(
        &self,
        code: &str,
        changes: &UrlChanges,
    ) -> Result<Option<FetchUrl>, super::DbError> {
        use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
        use diesel_async::RunQueryDsl;

        Ok(
            diesel::update(schema::urls::table.filter(schema::urls::code.eq(code)))
                .set(changes)
                .returning(FetchUrl::as_returning())
                .get_result(&mut self.db.0.get().await?)
                .await
                .optional()?,
        )
    }

    async fn delete_url(&self, code: &str) -> Result<usize, super::DbError> {
        use diesel::{ExpressionMethods, QueryDsl};
        use diesel_async::RunQueryDsl;

        Ok(
            diesel::delete(schema::urls::table.filter(schema::urls::code.eq(code)))
                .execute(&mut self.db.0.get().await?)
                .await?,
        )
    }

    async fn list_partners(&self) -> Result<Vec<FetchPartner>, super::DbError> {
        use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
        use diesel_async::RunQueryDsl;

        Ok(schema::partners::table
            .order(schema::partners::name.asc())
            .select(FetchPartner::as_select())
            .load(&mut self.db.0.get().await?)
            .await?)
    }

    async fn create_partner(&self, partner: &NewPartner) -> Result<FetchPartner, super::DbError> {
        use diesel::SelectableHelper;
        use diesel_async::RunQueryDsl;

        Ok(diesel::insert_into(schema::partners::table)
            .values(partner)
            .returning(FetchPartner::as_returning())
            .get_result(&mut self.db.0.get().await?)
            .await?)
    }

    async fn click_total(&self, code: &str) -> Result<Option<i32>, super::DbError> {
        use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
        use diesel_async::RunQueryDsl;

        Ok(schema::urls::table
            .filter(schema::urls::code.eq(code))
            .select(schema::urls::clicks)
            .first(&mut self.db.0.get().await?)
            .await
            .optional()?)
    }

    async fn top_countries(
        &self,
        code: &str,
        limit: i64,
    ) -> Result<Vec<CountryStat>, super::DbError> {
        use diesel_async::RunQueryDsl;

        Ok(diesel::sql_query(
            "SELECT country, COUNT(*) AS count FROM clicks \
             WHERE code = $1 AND country IS NOT NULL \
             GROUP BY country ORDER BY count DESC LIMIT $2",
        )
        .bind::<sql_types::Varchar, _>(code)
        .bind::<sql_types::BigInt, _>(limit)
        .load(&mut self.db.0.get().await?)
        .await?)
    }

    async fn devices(&self, code: &str) -> Result<Vec<DeviceStat>, super::DbError> {
        use diesel_async::RunQueryDsl;

        Ok(diesel::sql_query(
            "SELECT device, COUNT(*) AS count FROM clicks \
             WHERE code = $1 AND device IS NOT NULL \
             GROUP BY device ORDER BY count DESC",
        )
        .bind::<sql_types::Varchar, _>(code)
        .load(&mut self.db.0.get().await?)
        .await?)
    }

    async fn recent_clicks(&self, code: &str, limit: i64) -> Result<Vec<FetchClick>, super::DbError> {
        use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
        use diesel_async::RunQueryDsl;

        Ok(schema::clicks::table
            .filter(schema::clicks::code.eq(code))
            .order(schema::clicks::clicked_at.desc())
            .limit(limit)
            .select(FetchClick::as_select())
            .load(&mut self.db.0.get().await?)
            .await?)
    }

    async fn bypass_attempts(&self, code: &str) -> Result<BypassStat, super::DbError> {
        use diesel_async::RunQueryDsl;

        Ok(diesel::sql_query(
            "SELECT COUNT(*) AS count, MAX(detected_at) AS latest FROM bypass_logs WHERE code = $1",
        )
        .bind::<sql_types::Varchar, _>(code)
        .get_result(&mut self.db.0.get().await?)
        .await?)
    }
}
