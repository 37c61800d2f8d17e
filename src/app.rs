use crate::{
    db::{DbError, LinksDB},
    error::AppError,
    models::{NewPartner, NewUrl, UrlChanges},
};
use linkhub_rs::{
    Analytics, CreatePartnerRequest, CreateUrlRequest, DeleteResponse, Partner, ShortUrl,
    ShortUrlListing, UpdateUrlRequest,
};
use rand::{Rng, distr::Alphanumeric};
use url::Url;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const TOP_COUNTRIES_LIMIT: i64 = 10;
pub const RECENT_CLICKS_LIMIT: i64 = 50;

// width of `urls.code`
const MAX_CODE_LENGTH: usize = 32;

/// Random code drawn uniformly from `[A-Za-z0-9]`. Not meant to be unguessable.
pub fn generate_code(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn validate_url(url: Option<String>) -> Result<String, AppError> {
    let Some(url) = url else {
        return Err(AppError::BadRequest("URL is required".to_string()));
    };

    // scheme-less targets like `example.com` are stored as given
    let valid = match Url::parse(&url) {
        Ok(parsed) => ["http", "https"].contains(&parsed.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{url}")).is_ok_and(|parsed| parsed.has_host())
        }
        Err(_) => false,
    };

    if !valid {
        return Err(AppError::BadRequest("Invalid URL".to_string()));
    }

    Ok(url)
}

fn validate_code(code: &str) -> Result<(), AppError> {
    let valid = code.len() <= MAX_CODE_LENGTH
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid code".to_string()))
    }
}

fn write_error(e: DbError) -> AppError {
    match e {
        DbError::DuplicateId => AppError::Conflict("Code already exists".to_string()),
        DbError::UnknownPartner => AppError::NotFound("Partner not found".to_string()),
        e => AppError::Database(e),
    }
}

#[derive(Clone)]
pub struct App {
    db: Arc<dyn LinksDB>,
    code_length: usize,
}

impl App {
    pub fn new(code_length: usize, db: Arc<dyn LinksDB>) -> Arc<Self> {
        Arc::new(Self { db, code_length })
    }

    #[instrument(skip(self), err(level = "info"))]
    pub async fn list_urls(&self) -> Result<Vec<ShortUrlListing>, AppError> {
        let rows = self.db.list_urls().await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), err(level = "info"))]
    pub async fn create_url(&self, payload: CreateUrlRequest) -> Result<ShortUrl, AppError> {
        let url = validate_url(payload.url)?;

        let code = match payload.code {
            Some(code) => {
                validate_code(&code)?;
                code
            }
            None => generate_code(self.code_length),
        };

        // a generated code that collides is reported, not retried
        if self.db.url_exists(&code).await? {
            info!(code, "code already exists");
            return Err(AppError::Conflict("Code already exists".to_string()));
        }

        let new_url = NewUrl {
            code,
            url,
            partner_id: payload.partner_id.filter(|id| *id != 0),
            referrer_url: payload.referrer_url,
            expires_at: payload.expires_at,
        };

        let created = self.db.create_url(&new_url).await.map_err(|e| {
            if matches!(e, DbError::DuplicateId) {
                warn!(code = new_url.code, "lost insert race");
            }
            write_error(e)
        })?;

        info!(code = created.code, "url created");

        Ok(created.into())
    }

    #[instrument(skip(self), err(level = "info"))]
    pub async fn update_url(
        &self,
        code: &str,
        payload: UpdateUrlRequest,
    ) -> Result<ShortUrl, AppError> {
        let changes = UrlChanges {
            url: validate_url(payload.url)?,
            partner_id: payload.partner_id.filter(|id| *id != 0),
            referrer_url: payload.referrer_url,
            expires_at: payload.expires_at,
        };

        let Some(updated) = self
            .db
            .update_url(code, &changes)
            .await
            .map_err(write_error)?
        else {
            return Err(AppError::NotFound("URL not found".to_string()));
        };

        info!(code, "url updated");

        Ok(updated.into())
    }

    #[instrument(skip(self), err(level = "info"))]
    pub async fn delete_url(&self, code: &str) -> Result<DeleteResponse, AppError> {
        let deleted = self.db.delete_url(code).await?;

        info!(code, deleted, "url deleted");

        Ok(DeleteResponse { success: true })
    }

    #[instrument(skip(self), err(level = "info"))]
    pub async fn list_partners(&self) -> Result<Vec<Partner>, AppError> {
        let rows = self.db.list_partners().await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), err(level = "info"))]
    pub async fn create_partner(&self, payload: CreatePartnerRequest) -> Result<Partner, AppError> {
        let (Some(name), Some(domain)) = (payload.name, payload.domain) else {
            return Err(AppError::BadRequest(
                "Name and domain are required".to_string(),
            ));
        };

        let created = self.db.create_partner(&NewPartner { name, domain }).await?;

        info!(id = created.id, "partner created");

        Ok(created.into())
    }

    #[instrument(skip(self), err(level = "info"))]
    pub async fn analytics(&self, code: &str) -> Result<Analytics, AppError> {
        let Some(total_clicks) = self.db.click_total(code).await? else {
            return Err(AppError::NotFound("URL not found".to_string()));
        };

        let (top_countries, devices, recent_clicks, bypass_attempts) = tokio::try_join!(
            self.db.top_countries(code, TOP_COUNTRIES_LIMIT),
            self.db.devices(code),
            self.db.recent_clicks(code, RECENT_CLICKS_LIMIT),
            self.db.bypass_attempts(code),
        )?;

        Ok(Analytics {
            total_clicks,
            top_countries: top_countries.into_iter().map(Into::into).collect(),
            devices: devices.into_iter().map(Into::into).collect(),
            recent_clicks: recent_clicks.into_iter().map(Into::into).collect(),
            bypass_attempts: bypass_attempts.into(),
        })
    }
}

#[cfg(test)]
mod e2e_tests {
    use super::*;
    use crate::{
        db::PostgresDb,
        db_pool::{DbPool, init_crypto_provider, test_support::get_postgres_testcontainer},
        migrations::run_migrations,
    };
    use testcontainers::ContainerAsync;
    use testcontainers_modules::postgres::Postgres;

    async fn seed(pool: &DbPool, sql: &str) {
        use diesel_async::RunQueryDsl;
        diesel::sql_query(sql)
            .execute(&mut pool.0.get().await.unwrap())
            .await
            .unwrap();
    }

    async fn build_app() -> (ContainerAsync<Postgres>, DbPool, Arc<App>) {
        init_crypto_provider();

        let (container, dburl) = get_postgres_testcontainer().await;

        run_migrations(&dburl).unwrap();

        let pool = DbPool::build(&dburl, 2).await.unwrap();
        let app = App::new(6, Arc::new(PostgresDb::new(pool.clone())));

        (container, pool, app)
    }

    #[tokio::test]
    async fn test_url_lifecycle() {
        let (_db_container, _pool, app) = build_app().await;

        let partner = app
            .create_partner(CreatePartnerRequest {
                name: Some("Acme".to_string()),
                domain: Some("acme.example".to_string()),
            })
            .await
            .unwrap();

        let created = app
            .create_url(CreateUrlRequest {
                url: Some("https://www.rustunit.com".to_string()),
                code: Some("rust01".to_string()),
                partner_id: Some(partner.id),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(created.code, "rust01");
        assert_eq!(created.clicks, 0);
        assert_eq!(created.partner_id, Some(partner.id));

        let generated = app
            .create_url(CreateUrlRequest {
                url: Some("https://example.com".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(generated.code.len(), 6);

        let conflict = app
            .create_url(CreateUrlRequest {
                url: Some("https://other.example".to_string()),
                code: Some("rust01".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(conflict, Err(AppError::Conflict(_))));

        let listed = app.list_urls().await.unwrap();
        assert_eq!(listed.len(), 2);
        let rust01 = listed.iter().find(|l| l.url.code == "rust01").unwrap();
        assert_eq!(rust01.url.url, "https://www.rustunit.com");
        assert_eq!(rust01.partner_name.as_deref(), Some("Acme"));
        assert_eq!(rust01.partner_domain.as_deref(), Some("acme.example"));
        let other = listed.iter().find(|l| l.url.code != "rust01").unwrap();
        assert!(other.partner_name.is_none());

        let updated = app
            .update_url(
                "rust01",
                UpdateUrlRequest {
                    url: Some("https://www.rustunit.com/blog".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.url, "https://www.rustunit.com/blog");
        assert_eq!(updated.partner_id, None);

        let missing = app
            .update_url(
                "nope00",
                UpdateUrlRequest {
                    url: Some("https://example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        assert!(app.delete_url("rust01").await.unwrap().success);
        assert!(app.delete_url("rust01").await.unwrap().success);
        assert_eq!(app.list_urls().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_partner() {
        let (_db_container, _pool, app) = build_app().await;

        let res = app
            .create_url(CreateUrlRequest {
                url: Some("https://example.com".to_string()),
                code: Some("abc123".to_string()),
                partner_id: Some(4242),
                ..Default::default()
            })
            .await;

        assert!(matches!(res, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_partners_sorted_by_name() {
        let (_db_container, _pool, app) = build_app().await;

        for (name, domain) in [
            ("zeta", "z.example"),
            ("alpha", "a.example"),
            ("alpha", "a.example"),
        ] {
            app.create_partner(CreatePartnerRequest {
                name: Some(name.to_string()),
                domain: Some(domain.to_string()),
            })
            .await
            .unwrap();
        }

        let names: Vec<String> = app
            .list_partners()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["alpha", "alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_analytics() {
        let (_db_container, pool, app) = build_app().await;

        assert!(matches!(
            app.analytics("abc123").await,
            Err(AppError::NotFound(_))
        ));

        seed(
            &pool,
            "INSERT INTO urls (code, url, clicks) VALUES ('abc123', 'https://example.com', 42)",
        )
        .await;

        let empty = app.analytics("abc123").await.unwrap();
        assert_eq!(empty.total_clicks, 42);
        assert!(empty.top_countries.is_empty());
        assert!(empty.devices.is_empty());
        assert!(empty.recent_clicks.is_empty());
        assert_eq!(empty.bypass_attempts.count, 0);
        assert!(empty.bypass_attempts.latest.is_none());

        // 12 countries with 1..=12 clicks each, plus clicks without a country
        seed(
            &pool,
            "INSERT INTO clicks (code, country, device, clicked_at) \
             SELECT 'abc123', 'C' || c, CASE WHEN n % 2 = 0 THEN 'mobile' ELSE 'desktop' END, \
                    NOW() - (c * 100 + n) * INTERVAL '1 second' \
             FROM generate_series(1, 12) AS c, generate_series(1, 12) AS n WHERE n <= c",
        )
        .await;
        seed(
            &pool,
            "INSERT INTO clicks (code, country, device) VALUES ('abc123', NULL, NULL), ('other1', 'DE', 'tv')",
        )
        .await;
        seed(
            &pool,
            "INSERT INTO bypass_logs (code, detected_at) VALUES \
             ('abc123', '2030-01-01T00:00:00Z'), ('abc123', '2030-01-02T00:00:00Z'), ('other1', NOW())",
        )
        .await;

        let stats = app.analytics("abc123").await.unwrap();

        assert_eq!(stats.total_clicks, 42);
        assert_eq!(stats.top_countries.len(), 10);
        assert_eq!(stats.top_countries[0].country, "C12");
        assert_eq!(stats.top_countries[0].count, 12);
        assert!(
            stats
                .top_countries
                .windows(2)
                .all(|w| w[0].count >= w[1].count)
        );

        let device_total: i64 = stats.devices.iter().map(|d| d.count).sum();
        assert_eq!(device_total, 78);
        assert_eq!(stats.devices.len(), 2);

        assert_eq!(stats.recent_clicks.len(), 50);
        assert!(stats.recent_clicks.iter().all(|c| c.code == "abc123"));
        assert!(
            stats
                .recent_clicks
                .windows(2)
                .all(|w| w[0].clicked_at >= w[1].clicked_at)
        );

        assert_eq!(stats.bypass_attempts.count, 2);
        assert_eq!(
            stats.bypass_attempts.latest.map(|t| t.to_rfc3339()),
            Some("2030-01-02T00:00:00+00:00".to_string())
        );
    }
}
