// src/upstream/types.rs
use serde::{Deserialize, Deserializer, Serialize};

/// A school as listed by `schoolInfo`. Only the fields this service reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchoolRow {
    #[serde(rename = "ATPT_OFCDC_SC_CODE", default, deserialize_with = "null_as_empty")]
    pub office_code: String,
    #[serde(rename = "SD_SCHUL_CODE", default, deserialize_with = "null_as_empty")]
    pub school_code: String,
    #[serde(rename = "SCHUL_NM", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "ORG_RDNMA", default, deserialize_with = "null_as_empty")]
    pub address: String,
}

/// One meal slot of one day, as listed by `mealServiceDietInfo`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MealRow {
    #[serde(rename = "MLSV_YMD", default, deserialize_with = "null_as_empty")]
    pub date: String,
    /// Slot label (조식/중식/석식).
    #[serde(rename = "MMEAL_SC_NM", default, deserialize_with = "null_as_empty")]
    pub slot: String,
    /// Dishes separated by `<br/>`, each possibly followed by allergy codes.
    #[serde(rename = "DDISH_NM", default, deserialize_with = "null_as_empty")]
    pub dishes: String,
    #[serde(rename = "CAL_INFO", default, deserialize_with = "null_as_empty")]
    pub calories: String,
    #[serde(rename = "NTR_INFO", default, deserialize_with = "null_as_empty")]
    pub nutrition: String,
}

/// The hub sends `null` for fields it has no value for.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
