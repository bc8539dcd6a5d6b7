// tests/common/mod.rs
//
// In-memory stand-in for the NEIS hub, plus router builders.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};

use school_meal_proxy::aggregate::{AggregationSettings, DistrictAverager, DistrictCache};
use school_meal_proxy::api::{self, AppState, PageSizes};
use school_meal_proxy::cache::Clock;
use school_meal_proxy::upstream::{MealApi, Params, MEAL_SERVICE, SCHOOL_INFO};
use school_meal_proxy::UpstreamError;

pub const BODY_LIMIT: usize = 1024 * 1024;
pub const FULL_NTR: &str = "탄수화물(g) : 100.0<br/>단백질(g) : 30.0<br/>지방(g) : 20.0<br/>나트륨(mg) : 900.1";

#[derive(Default)]
pub struct StubHub {
    /// office code -> schools, in listing order
    pub districts: HashMap<String, Vec<Value>>,
    /// school code -> meal rows (any date)
    pub meals: HashMap<String, Vec<Value>>,
    /// school codes whose meal lookups fail with a transport-like error
    pub failing_schools: HashSet<String>,
    /// every meal lookup fails
    pub meal_outage: bool,
    /// school-list page numbers that fail
    pub failing_pages: HashSet<usize>,
    /// school-list responses come back malformed
    pub malformed_listing: bool,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<(String, Params)>>,
}

pub fn school(office: &str, code: &str, name: &str) -> Value {
    json!({
        "ATPT_OFCDC_SC_CODE": office,
        "SD_SCHUL_CODE": code,
        "SCHUL_NM": name,
        "ORG_RDNMA": "서울특별시 어딘가로 1"
    })
}

pub fn meal(date: &str, slot: &str, ntr: &str) -> Value {
    json!({
        "MLSV_YMD": date,
        "MMEAL_SC_NM": slot,
        "DDISH_NM": "현미밥<br/>쇠고기미역국(5.6.13.16.)<br/>배추김치(9.13.)",
        "CAL_INFO": "650.0 Kcal",
        "NTR_INFO": ntr
    })
}

pub fn envelope(resource: &str, rows: Vec<Value>) -> Value {
    let section = json!([
        { "head": [ { "list_total_count": rows.len() }, { "RESULT": { "CODE": "INFO-000" } } ] },
        { "row": rows }
    ]);
    let mut body = serde_json::Map::new();
    body.insert(resource.to_string(), section);
    Value::Object(body)
}

pub fn no_data() -> Value {
    json!({ "RESULT": { "CODE": "INFO-200", "MESSAGE": "해당하는 데이터가 없습니다." } })
}

fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.as_str())
}

impl StubHub {
    pub fn with_district(mut self, office: &str, n: usize) -> Self {
        let schools = (0..n)
            .map(|i| school(office, &format!("{office}-{i:04}"), &format!("학교{i}")))
            .collect();
        self.districts.insert(office.to_string(), schools);
        self
    }

    pub fn with_meals_everywhere(mut self, office: &str, date: &str, ntr: &str) -> Self {
        let codes: Vec<String> = self
            .districts
            .get(office)
            .map(|v| {
                v.iter()
                    .map(|s| s["SD_SCHUL_CODE"].as_str().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default();
        for code in codes {
            self.meals.insert(code, vec![meal(date, "중식", ntr)]);
        }
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, resource: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == resource)
            .count()
    }

    fn school_info(&self, params: &Params) -> Result<Value, UpstreamError> {
        if self.malformed_listing {
            return Ok(json!({ "schoolInfo": "oops" }));
        }
        if let Some(name) = param(params, "SCHUL_NM") {
            let found: Vec<Value> = self
                .districts
                .values()
                .flatten()
                .filter(|s| s["SCHUL_NM"].as_str().unwrap_or_default().contains(name))
                .cloned()
                .collect();
            return Ok(if found.is_empty() {
                no_data()
            } else {
                envelope(SCHOOL_INFO, found)
            });
        }

        let page: usize = param(params, "pIndex").and_then(|p| p.parse().ok()).unwrap_or(1);
        let size: usize = param(params, "pSize").and_then(|p| p.parse().ok()).unwrap_or(100);
        if self.failing_pages.contains(&page) {
            return Err(UpstreamError::Status {
                status: 503,
                body: None,
            });
        }
        let office = param(params, "ATPT_OFCDC_SC_CODE").unwrap_or_default();
        let all = self.districts.get(office).cloned().unwrap_or_default();
        let chunk: Vec<Value> = all.into_iter().skip((page - 1) * size).take(size).collect();
        Ok(if chunk.is_empty() {
            no_data()
        } else {
            envelope(SCHOOL_INFO, chunk)
        })
    }

    fn meal_service(&self, params: &Params) -> Result<Value, UpstreamError> {
        let code = param(params, "SD_SCHUL_CODE").unwrap_or_default();
        if self.meal_outage || self.failing_schools.contains(code) {
            return Err(UpstreamError::Status {
                status: 500,
                body: Some(json!({ "RESULT": { "CODE": "ERROR-500", "MESSAGE": "서버 오류" } })),
            });
        }
        let rows: Vec<Value> = self
            .meals
            .get(code)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|m| {
                let d = m["MLSV_YMD"].as_str().unwrap_or_default();
                match (
                    param(params, "MLSV_YMD"),
                    param(params, "MLSV_FROM_YMD"),
                    param(params, "MLSV_TO_YMD"),
                ) {
                    (Some(day), _, _) => d == day,
                    (None, Some(from), Some(to)) => d >= from && d <= to,
                    _ => true,
                }
            })
            .collect();
        Ok(if rows.is_empty() {
            no_data()
        } else {
            envelope(MEAL_SERVICE, rows)
        })
    }
}

#[async_trait]
impl MealApi for StubHub {
    async fn fetch(&self, resource: &str, params: &Params) -> Result<Value, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((resource.to_string(), params.clone()));
        match resource {
            SCHOOL_INFO => self.school_info(params),
            MEAL_SERVICE => self.meal_service(params),
            other => Ok(json!({ "unknown": other })),
        }
    }
}

pub const WEEK: Duration = Duration::from_secs(7 * 24 * 3600);

pub fn averager(hub: Arc<StubHub>, clock: Arc<dyn Clock>) -> Arc<DistrictAverager> {
    let cache = Arc::new(DistrictCache::with_clock(WEEK, clock));
    Arc::new(DistrictAverager::new(
        hub,
        cache,
        AggregationSettings::default(),
    ))
}

pub fn state(hub: Arc<StubHub>, clock: Arc<dyn Clock>) -> AppState {
    let avg = averager(hub.clone(), clock);
    AppState::new(hub, avg, PageSizes::default())
}

pub fn test_router(hub: Arc<StubHub>, clock: Arc<dyn Clock>) -> Router {
    api::router(state(hub, clock))
}
