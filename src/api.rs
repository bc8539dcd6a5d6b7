// src/api.rs
//! HTTP facade: parameter validation and delegation to the hub client and
//! the district averager.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Months, NaiveDate};
use serde_json::{json, Value};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::aggregate::{AggregationSettings, DistrictAverage, DistrictAverager, DistrictCache};
use crate::config::Config;
use crate::error::{ApiError, UpstreamError};
use crate::menu;
use crate::sampler::Paging;
use crate::upstream::{meals_on, rows, MealApi, NeisClient, Params, MEAL_SERVICE, SCHOOL_INFO};

const NO_SCHOOLS_MESSAGE: &str = "could not load any schools for this education office";

#[derive(Debug, Clone, Copy)]
pub struct PageSizes {
    pub search: usize,
    pub month: usize,
    pub day: usize,
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            search: 10,
            month: 100,
            day: 10,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    api: Arc<dyn MealApi>,
    averager: Arc<DistrictAverager>,
    pages: PageSizes,
}

impl AppState {
    pub fn new(api: Arc<dyn MealApi>, averager: Arc<DistrictAverager>, pages: PageSizes) -> Self {
        Self {
            api,
            averager,
            pages,
        }
    }

    /// Wire the real NEIS client and a fresh cache from configuration.
    pub fn from_config(cfg: &Config) -> Result<Self, UpstreamError> {
        let client = NeisClient::new(
            cfg.neis_base_url.clone(),
            cfg.neis_api_key.clone(),
            cfg.upstream_timeout(),
        )?;
        let api: Arc<dyn MealApi> = Arc::new(client);
        let cache = Arc::new(DistrictCache::new(cfg.cache_ttl()));
        let settings = AggregationSettings {
            paging: Paging {
                page_size: cfg.page_size,
                max_pages: cfg.max_pages,
            },
            sample_size: cfg.sample_size,
            fanout_concurrency: cfg.fanout_concurrency,
            day_meal_page_size: cfg.day_meal_page_size,
        };
        let averager = Arc::new(DistrictAverager::new(api.clone(), cache, settings));
        let pages = PageSizes {
            search: cfg.search_page_size,
            month: cfg.meal_page_size,
            day: cfg.day_meal_page_size,
        };
        Ok(Self::new(api, averager, pages))
    }

    pub fn cache(&self) -> &Arc<DistrictCache> {
        self.averager.cache()
    }
}

/// API routes only.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/searchSchool", get(search_school))
        .route("/api/getMeal", get(get_meal))
        .route("/api/getDistrictAverage", get(get_district_average))
        .route("/api/getDaySummary", get(get_day_summary))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API routes plus the dashboard's static files, with unknown paths
/// answered by `index.html`. Static serving is skipped when the directory
/// does not exist.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let api = router(state);
    if !static_dir.is_dir() {
        tracing::warn!(dir = %static_dir.display(), "static dir missing; serving API only");
        return api;
    }
    let index = ServeFile::new(static_dir.join("index.html"));
    api.fallback_service(ServeDir::new(static_dir).fallback(index))
}

type Q = Query<HashMap<String, String>>;

/// Required, non-empty query parameters in declaration order.
fn required<'a, const N: usize>(
    q: &'a HashMap<String, String>,
    names: [&str; N],
    message: &'static str,
) -> Result<[&'a str; N], ApiError> {
    let mut out = [""; N];
    for (slot, name) in out.iter_mut().zip(names) {
        *slot = q
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::MissingParams(message))?;
    }
    Ok(out)
}

/// `YYYYMMDD` naming a real calendar day.
fn validate_date(date: &str) -> Result<(), ApiError> {
    let well_formed = date.len() == 8
        && date.bytes().all(|b| b.is_ascii_digit())
        && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok();
    if well_formed {
        Ok(())
    } else {
        Err(ApiError::InvalidParam(format!(
            "date must be YYYYMMDD, got '{date}'"
        )))
    }
}

/// First and last `YYYYMMDD` of a month.
fn month_range(year: &str, month: &str) -> Result<(String, String), ApiError> {
    let invalid = || ApiError::InvalidParam(format!("invalid year/month '{year}'/'{month}'"));
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let y: i32 = year.parse().map_err(|_| invalid())?;
    let m: u32 = month.parse().map_err(|_| invalid())?;
    let first = NaiveDate::from_ymd_opt(y, m, 1).ok_or_else(invalid)?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
        .ok_or_else(invalid)?;
    Ok((
        format!("{y:04}{m:02}01"),
        format!("{y:04}{m:02}{:02}", last.day()),
    ))
}

async fn search_school(State(state): State<AppState>, Query(q): Q) -> Result<Json<Vec<Value>>, ApiError> {
    let [name] = required(&q, ["schoolName"], "schoolName is required")?;

    let params: Params = vec![
        ("pIndex", "1".to_string()),
        ("pSize", state.pages.search.to_string()),
        ("SCHUL_NM", name.to_string()),
    ];
    let fail = |e| ApiError::upstream("failed to fetch school information", e);
    let body = state.api.fetch(SCHOOL_INFO, &params).await.map_err(fail)?;
    let found = rows(&body, SCHOOL_INFO).map_err(fail)?.unwrap_or_default();
    Ok(Json(found))
}

async fn get_meal(State(state): State<AppState>, Query(q): Q) -> Result<Json<Vec<Value>>, ApiError> {
    let [school_code, office_code, year, month] = required(
        &q,
        ["schoolCode", "officeCode", "year", "month"],
        "schoolCode, officeCode, year and month are required",
    )?;
    let (from, to) = month_range(year, month)?;

    let params: Params = vec![
        ("pIndex", "1".to_string()),
        ("pSize", state.pages.month.to_string()),
        ("ATPT_OFCDC_SC_CODE", office_code.to_string()),
        ("SD_SCHUL_CODE", school_code.to_string()),
        ("MLSV_FROM_YMD", from),
        ("MLSV_TO_YMD", to),
    ];
    let fail = |e| ApiError::upstream("failed to fetch meal information", e);
    let body = state.api.fetch(MEAL_SERVICE, &params).await.map_err(fail)?;
    let meals = rows(&body, MEAL_SERVICE).map_err(fail)?.unwrap_or_default();
    Ok(Json(meals))
}

async fn get_district_average(State(state): State<AppState>, Query(q): Q) -> Result<Response, ApiError> {
    let [office_code, date] = required(&q, ["officeCode", "date"], "officeCode and date are required")?;
    validate_date(date)?;

    let outcome = state
        .averager
        .district_average(office_code, date)
        .await
        .map_err(|e| ApiError::upstream("failed to compute district average", e))?;

    Ok(match outcome {
        DistrictAverage::Computed(result) => Json(result).into_response(),
        // Soft "no data": 200 with an error field, which the dashboard renders as empty.
        DistrictAverage::NoSchools => Json(json!({ "error": NO_SCHOOLS_MESSAGE })).into_response(),
    })
}

async fn get_day_summary(
    State(state): State<AppState>,
    Query(q): Q,
) -> Result<Json<menu::DaySummary>, ApiError> {
    let [school_code, office_code, date] = required(
        &q,
        ["schoolCode", "officeCode", "date"],
        "schoolCode, officeCode and date are required",
    )?;
    validate_date(date)?;

    let meals = meals_on(state.api.as_ref(), office_code, school_code, date, state.pages.day)
        .await
        .map_err(|e| ApiError::upstream("failed to fetch meal information", e))?;
    Ok(Json(menu::summarize_day(date, &meals)))
}
