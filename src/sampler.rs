// src/sampler.rs
//! District school listing and uniform sampling without replacement.

use rand::Rng;
use tracing::{debug, warn};

use crate::error::UpstreamError;
use crate::upstream::{rows, MealApi, Params, SchoolRow, SCHOOL_INFO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub page_size: usize,
    pub max_pages: usize,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_pages: 10,
        }
    }
}

/// Every school in the district, in fetch order, up to `max_pages * page_size`.
///
/// Paging stops on a short page, at the page ceiling, or at the first page
/// request that fails (treated as "no more pages"). A page whose payload has
/// the wrong shape is a hard error.
pub async fn list_schools(
    api: &dyn MealApi,
    office_code: &str,
    paging: Paging,
) -> Result<Vec<SchoolRow>, UpstreamError> {
    let mut schools = Vec::new();

    for page in 1..=paging.max_pages {
        let params: Params = vec![
            ("pIndex", page.to_string()),
            ("pSize", paging.page_size.to_string()),
            ("ATPT_OFCDC_SC_CODE", office_code.to_string()),
        ];
        let body = match api.fetch(SCHOOL_INFO, &params).await {
            Ok(b) => b,
            Err(e) => {
                warn!(office_code, page, error = %e, "school list page failed; stopping");
                break;
            }
        };
        let Some(page_rows) = rows(&body, SCHOOL_INFO)? else {
            break;
        };

        let fetched = page_rows.len();
        schools.extend(
            page_rows
                .into_iter()
                .filter_map(|v| serde_json::from_value::<SchoolRow>(v).ok()),
        );
        debug!(office_code, page, fetched, "school list page");

        if fetched < paging.page_size {
            break;
        }
    }

    Ok(schools)
}

/// Draw `min(max_count, items.len())` elements without replacement.
/// The result is in selection order.
pub fn sample<T, R>(mut items: Vec<T>, max_count: usize, rng: &mut R) -> Vec<T>
where
    R: Rng,
{
    let target = max_count.min(items.len());
    let mut picked = Vec::with_capacity(target);
    while picked.len() < target {
        let idx = rng.random_range(0..items.len());
        picked.push(items.swap_remove(idx));
    }
    picked
}
