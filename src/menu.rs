// src/menu.rs
//! Dish list and allergy annotations carried in `DDISH_NM` / `CAL_INFO`.
//!
//! A dish entry looks like `쇠고기미역국(5.6.13.16.)`: the parenthesised
//! group lists allergy codes from the national 19-item table.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::nutrition::{self, Macros};
use crate::upstream::MealRow;

static RE_PAREN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").expect("paren regex"));
static RE_ALLERGY_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(((?:\d+\.?)+)\)").expect("allergy group regex"));
static RE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("break regex"));
static RE_LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d*)?|\.\d+)").expect("number regex"));

const ALLERGENS: [&str; 19] = [
    "난류",
    "우유",
    "메밀",
    "땅콩",
    "대두",
    "밀",
    "고등어",
    "게",
    "새우",
    "돼지고기",
    "복숭아",
    "토마토",
    "아황산류",
    "호두",
    "닭고기",
    "쇠고기",
    "오징어",
    "조개류(굴, 전복, 홍합 포함)",
    "잣",
];

/// Dish names with allergy groups removed, in menu order.
pub fn dish_names(ddish: &str) -> Vec<String> {
    RE_BREAK
        .split(ddish)
        .map(|item| RE_PAREN.replace_all(item, "").trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Distinct allergy codes mentioned anywhere in the listing, ascending.
pub fn allergy_codes(ddish: &str) -> Vec<u8> {
    let mut codes: Vec<u8> = RE_ALLERGY_GROUP
        .captures_iter(ddish)
        .filter_map(|c| c.get(1))
        .flat_map(|m| m.as_str().split('.'))
        .filter_map(|n| n.parse::<u8>().ok())
        .collect();
    codes.sort_unstable();
    codes.dedup();
    codes
}

pub fn allergen_name(code: u8) -> Option<&'static str> {
    let idx = usize::from(code).checked_sub(1)?;
    ALLERGENS.get(idx).copied()
}

/// Leading number of `CAL_INFO` (e.g. `"612.3 Kcal"` → 612.3).
pub fn parse_calories(cal_info: &str) -> Option<f64> {
    RE_LEADING_NUMBER
        .captures(cal_info)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSummary {
    pub slot: String,
    pub dishes: Vec<String>,
    pub allergy_codes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allergen {
    pub code: u8,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DayTotals {
    pub cal: f64,
    #[serde(flatten)]
    pub macros: Macros,
}

/// Everything the dashboard shows for one school-day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: String,
    pub meals: Vec<MealSummary>,
    pub allergens: Vec<Allergen>,
    pub totals: DayTotals,
}

/// Fold a day's meal records into a summary. Each nutrient is summed on its
/// own, so a record missing one label still contributes the others.
pub fn summarize_day(date: &str, meals: &[MealRow]) -> DaySummary {
    let mut totals = DayTotals::default();
    let mut all_codes = Vec::new();
    let mut out = Vec::with_capacity(meals.len());

    for meal in meals {
        let codes = allergy_codes(&meal.dishes);
        all_codes.extend_from_slice(&codes);

        totals.cal += parse_calories(&meal.calories).unwrap_or(0.0);
        let n = nutrition::extract(&meal.nutrition);
        totals.macros.carb += n.carb.unwrap_or(0.0);
        totals.macros.prot += n.prot.unwrap_or(0.0);
        totals.macros.fat += n.fat.unwrap_or(0.0);

        out.push(MealSummary {
            slot: meal.slot.clone(),
            dishes: dish_names(&meal.dishes),
            allergy_codes: codes,
        });
    }

    all_codes.sort_unstable();
    all_codes.dedup();
    let allergens = all_codes
        .into_iter()
        .map(|code| Allergen {
            code,
            name: allergen_name(code).unwrap_or("정보없음"),
        })
        .collect();

    DaySummary {
        date: date.to_string(),
        meals: out,
        allergens,
        totals,
    }
}
