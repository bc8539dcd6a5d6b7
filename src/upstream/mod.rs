// src/upstream/mod.rs
//! NEIS hub access: the `MealApi` seam, the reqwest client, and row views.

pub mod client;
pub mod types;

pub use client::NeisClient;
pub use types::{MealRow, SchoolRow};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::UpstreamError;

pub const SCHOOL_INFO: &str = "schoolInfo";
pub const MEAL_SERVICE: &str = "mealServiceDietInfo";

/// Query parameters for one upstream call, excluding `KEY` and `Type`.
pub type Params = Vec<(&'static str, String)>;

/// One GET against the hub. Implementations must not retry.
#[async_trait]
pub trait MealApi: Send + Sync {
    async fn fetch(&self, resource: &str, params: &Params) -> Result<Value, UpstreamError>;
}

/// Extract the row array from `{ <resource>: [header, { row: [...] }] }`.
///
/// `Ok(None)` when the resource field is absent, which is how the hub says
/// "no data" (it answers with a bare `RESULT` object instead).
pub fn rows(body: &Value, resource: &str) -> Result<Option<Vec<Value>>, UpstreamError> {
    let Some(section) = body.get(resource) else {
        return Ok(None);
    };
    let shape = || UpstreamError::Shape {
        resource: resource.to_string(),
    };
    let block = section.get(1).filter(|b| b.is_object()).ok_or_else(shape)?;
    match block.get("row") {
        None | Some(Value::Null) => Ok(Some(Vec::new())),
        Some(Value::Array(items)) => Ok(Some(items.clone())),
        Some(_) => Err(shape()),
    }
}

/// Like [`rows`], but deserialized into typed views. Rows that fail to
/// deserialize are skipped.
pub fn typed_rows<T: DeserializeOwned>(
    body: &Value,
    resource: &str,
) -> Result<Option<Vec<T>>, UpstreamError> {
    Ok(rows(body, resource)?.map(|items| {
        items
            .into_iter()
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }))
}

/// Meals one school serves on one `YYYYMMDD` date. Empty when the hub has
/// no data for that day.
pub async fn meals_on(
    api: &dyn MealApi,
    office_code: &str,
    school_code: &str,
    date: &str,
    page_size: usize,
) -> Result<Vec<MealRow>, UpstreamError> {
    let params: Params = vec![
        ("pIndex", "1".to_string()),
        ("pSize", page_size.to_string()),
        ("ATPT_OFCDC_SC_CODE", office_code.to_string()),
        ("SD_SCHUL_CODE", school_code.to_string()),
        ("MLSV_YMD", date.to_string()),
    ];
    let body = api.fetch(MEAL_SERVICE, &params).await?;
    Ok(typed_rows(&body, MEAL_SERVICE)?.unwrap_or_default())
}
