use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types;
use linkhub_rs::{
    BypassAttempts, ClickEvent, CountryCount, DeviceCount, Partner, ShortUrl, ShortUrlListing,
};

#[derive(Insertable, Clone, Debug, PartialEq)]
#[diesel(table_name = crate::schema::urls)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUrl {
    pub code: String,
    pub url: String,
    pub partner_id: Option<i32>,
    pub referrer_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

// PUT replaces the whole editable set, so a missing field clears the column
#[derive(AsChangeset, Clone, Debug, PartialEq)]
#[diesel(table_name = crate::schema::urls)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UrlChanges {
    pub url: String,
    pub partner_id: Option<i32>,
    pub referrer_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Clone, PartialEq, Debug)]
#[diesel(table_name = crate::schema::urls)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FetchUrl {
    pub code: String,
    pub url: String,
    pub partner_id: Option<i32>,
    pub referrer_url: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created: DateTime<Utc>,
    pub clicks: i32,
}

/// A url row plus `(name, domain)` of its partner, if any.
#[derive(Clone, PartialEq, Debug)]
pub struct FetchUrlWithPartner {
    pub url: FetchUrl,
    pub partner: Option<(String, String)>,
}

#[derive(Insertable, Clone, Debug, PartialEq, Eq)]
#[diesel(table_name = crate::schema::partners)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewPartner {
    pub name: String,
    pub domain: String,
}

#[derive(Queryable, Selectable, Clone, PartialEq, Eq, Debug)]
#[diesel(table_name = crate::schema::partners)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FetchPartner {
    pub id: i32,
    pub name: String,
    pub domain: String,
}

#[derive(Queryable, Selectable, Clone, PartialEq, Debug)]
#[diesel(table_name = crate::schema::clicks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FetchClick {
    pub id: i64,
    pub code: String,
    pub country: Option<String>,
    pub device: Option<String>,
    pub clicked_at: DateTime<Utc>,
}

#[derive(QueryableByName, Clone, PartialEq, Eq, Debug)]
pub struct CountryStat {
    #[diesel(sql_type = sql_types::Varchar)]
    pub country: String,
    #[diesel(sql_type = sql_types::BigInt)]
    pub count: i64,
}

#[derive(QueryableByName, Clone, PartialEq, Eq, Debug)]
pub struct DeviceStat {
    #[diesel(sql_type = sql_types::Varchar)]
    pub device: String,
    #[diesel(sql_type = sql_types::BigInt)]
    pub count: i64,
}

#[derive(QueryableByName, Clone, Default, PartialEq, Debug)]
pub struct BypassStat {
    #[diesel(sql_type = sql_types::BigInt)]
    pub count: i64,
    #[diesel(sql_type = sql_types::Nullable<sql_types::Timestamptz>)]
    pub latest: Option<DateTime<Utc>>,
}

impl From<FetchUrl> for ShortUrl {
    fn from(row: FetchUrl) -> Self {
        Self {
            code: row.code,
            url: row.url,
            partner_id: row.partner_id,
            referrer_url: row.referrer_url,
            expires_at: row.expires_at,
            created: row.created,
            clicks: row.clicks,
        }
    }
}

impl From<FetchUrlWithPartner> for ShortUrlListing {
    fn from(row: FetchUrlWithPartner) -> Self {
        let (partner_name, partner_domain) = row.partner.unzip();
        Self {
            url: row.url.into(),
            partner_name,
            partner_domain,
        }
    }
}

impl From<FetchPartner> for Partner {
    fn from(row: FetchPartner) -> Self {
        Self {
            id: row.id,
            name: row.name,
            domain: row.domain,
        }
    }
}

impl From<FetchClick> for ClickEvent {
    fn from(row: FetchClick) -> Self {
        Self {
            id: row.id,
            code: row.code,
            country: row.country,
            device: row.device,
            clicked_at: row.clicked_at,
        }
    }
}

impl From<CountryStat> for CountryCount {
    fn from(row: CountryStat) -> Self {
        Self {
            country: row.country,
            count: row.count,
        }
    }
}

impl From<DeviceStat> for DeviceCount {
    fn from(row: DeviceStat) -> Self {
        Self {
            device: row.device,
            count: row.count,
        }
    }
}

impl From<BypassStat> for BypassAttempts {
    fn from(row: BypassStat) -> Self {
        Self {
            count: row.count,
            latest: row.latest,
        }
    }
}
