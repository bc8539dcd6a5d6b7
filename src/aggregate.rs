// src/aggregate.rs
//! District-average nutrition: sample schools in an education office, pull
//! their meals for one day concurrently, and average carb / protein / fat.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cache::TtlCache;
use crate::error::UpstreamError;
use crate::nutrition::{self, Macros, NutritionTotals};
use crate::sampler::{self, Paging};
use crate::upstream::{meals_on, MealApi, MealRow};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub office_code: String,
    pub date: String,
}

impl CacheKey {
    pub fn new(office_code: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            office_code: office_code.into(),
            date: date.into(),
        }
    }
}

pub type DistrictCache = TtlCache<CacheKey, DistrictAverageResult>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampledSchool {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictAverageResult {
    pub date: String,
    pub total_school_count: usize,
    /// Number of meal records that carried carb, protein and fat.
    pub sample_size: usize,
    pub sampled_schools: Vec<SampledSchool>,
    pub average_nutrition: Macros,
    pub cached: bool,
    pub cached_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DistrictAverage {
    Computed(DistrictAverageResult),
    /// The office listed no schools (or the first page failed).
    NoSchools,
}

#[derive(Debug, Clone, Copy)]
pub struct AggregationSettings {
    pub paging: Paging,
    pub sample_size: usize,
    pub fanout_concurrency: usize,
    pub day_meal_page_size: usize,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            paging: Paging::default(),
            sample_size: 100,
            fanout_concurrency: 100,
            day_meal_page_size: 10,
        }
    }
}

pub struct DistrictAverager {
    api: Arc<dyn MealApi>,
    cache: Arc<DistrictCache>,
    settings: AggregationSettings,
}

impl DistrictAverager {
    pub fn new(
        api: Arc<dyn MealApi>,
        cache: Arc<DistrictCache>,
        settings: AggregationSettings,
    ) -> Self {
        Self {
            api,
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &Arc<DistrictCache> {
        &self.cache
    }

    /// Cached result when fresh; otherwise a new aggregation, which is then cached.
    ///
    /// Only a malformed school-list payload fails the call. Per-school meal
    /// failures lower the contributor count and nothing else.
    pub async fn district_average(
        &self,
        office_code: &str,
        date: &str,
    ) -> Result<DistrictAverage, UpstreamError> {
        let key = CacheKey::new(office_code, date);
        if let Some(hit) = self.cache.get(&key) {
            counter!("district_cache_hits_total").increment(1);
            info!(office_code, date, "district average served from cache");
            return Ok(DistrictAverage::Computed(hit));
        }
        counter!("district_cache_misses_total").increment(1);

        let started = Instant::now();
        let schools = sampler::list_schools(self.api.as_ref(), office_code, self.settings.paging).await?;
        if schools.is_empty() {
            warn!(office_code, "no schools listed for office");
            return Ok(DistrictAverage::NoSchools);
        }

        let total_school_count = schools.len();
        let sampled = {
            let mut rng = rand::rng();
            sampler::sample(schools, self.settings.sample_size, &mut rng)
        };
        info!(
            office_code,
            total = total_school_count,
            sampled = sampled.len(),
            "sampled schools"
        );

        let page_size = self.settings.day_meal_page_size;
        let lookups: Vec<_> = sampled
            .iter()
            .map(|school| {
                let api = Arc::clone(&self.api);
                let office_code = office_code.to_string();
                let date = date.to_string();
                let code = school.school_code.clone();
                let name = school.name.clone();
                async move { meals_or_empty(api, &office_code, &code, &name, &date, page_size).await }
            })
            .collect();
        let per_school: Vec<Vec<MealRow>> = stream::iter(lookups)
            .buffer_unordered(self.settings.fanout_concurrency)
            .collect()
            .await;

        let mut totals = NutritionTotals::default();
        for meal in per_school.iter().flatten() {
            totals.add_complete(&nutrition::extract(&meal.nutrition));
        }

        let result = DistrictAverageResult {
            date: date.to_string(),
            total_school_count,
            sample_size: totals.count,
            sampled_schools: sampled
                .into_iter()
                .map(|s| SampledSchool {
                    code: s.school_code,
                    name: s.name,
                })
                .collect(),
            average_nutrition: totals.mean(),
            cached: false,
            cached_at: None,
        };

        let snapshot = DistrictAverageResult {
            cached: true,
            cached_at: Some(self.cache.now()),
            ..result.clone()
        };
        self.cache.set(key, snapshot);

        histogram!("district_aggregation_ms").record(started.elapsed().as_secs_f64() * 1_000.0);
        info!(
            office_code,
            date,
            contributors = result.sample_size,
            "district average computed"
        );
        Ok(DistrictAverage::Computed(result))
    }
}

/// One school's meals for the day. Failures are logged and count as no meals.
async fn meals_or_empty(
    api: Arc<dyn MealApi>,
    office_code: &str,
    school_code: &str,
    school_name: &str,
    date: &str,
    page_size: usize,
) -> Vec<MealRow> {
    match meals_on(api.as_ref(), office_code, school_code, date, page_size).await {
        Ok(meals) => meals,
        Err(e) => {
            counter!("district_school_fetch_failures_total").increment(1);
            warn!(school = %school_name, code = %school_code, error = %e, "meal lookup failed");
            Vec::new()
        }
    }
}
