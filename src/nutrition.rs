// src/nutrition.rs
//! Pulls carbohydrate / protein / fat grams out of the hub's `NTR_INFO` text,
//! e.g. `탄수화물(g) : 94.2<br/>단백질(g) : 28.1<br/>지방(g) : 19.0<br/>...`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static RE_CARB: Lazy<Regex> = Lazy::new(|| nutrient_regex("탄수화물"));
static RE_PROT: Lazy<Regex> = Lazy::new(|| nutrient_regex("단백질"));
static RE_FAT: Lazy<Regex> = Lazy::new(|| nutrient_regex("지방"));

fn nutrient_regex(label: &str) -> Regex {
    // `<label>(g) : <digits with at most one decimal point>`
    Regex::new(&format!(r"{label}\(g\)\s*:\s*(\d+(?:\.\d*)?|\.\d+)")).expect("nutrient regex")
}

/// Per-record extraction. Each field is independent; `None` means the label
/// was absent, not zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Nutrients {
    pub carb: Option<f64>,
    pub prot: Option<f64>,
    pub fat: Option<f64>,
}

impl Nutrients {
    /// All three values, or nothing.
    pub fn complete(&self) -> Option<(f64, f64, f64)> {
        Some((self.carb?, self.prot?, self.fat?))
    }
}

pub fn extract(ntr_info: &str) -> Nutrients {
    Nutrients {
        carb: first_value(&RE_CARB, ntr_info),
        prot: first_value(&RE_PROT, ntr_info),
        fat: first_value(&RE_FAT, ntr_info),
    }
}

fn first_value(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Gram totals serialized as `{carb, prot, fat}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub carb: f64,
    pub prot: f64,
    pub fat: f64,
}

/// Running sums over records that carried all three nutrients.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NutritionTotals {
    pub sums: Macros,
    pub count: usize,
}

impl NutritionTotals {
    /// Adds the record only when carb, protein and fat are all present.
    /// Returns whether it contributed.
    pub fn add_complete(&mut self, n: &Nutrients) -> bool {
        match n.complete() {
            Some((carb, prot, fat)) => {
                self.sums.carb += carb;
                self.sums.prot += prot;
                self.sums.fat += fat;
                self.count += 1;
                true
            }
            None => false,
        }
    }

    /// Per-nutrient mean; zeros when nothing contributed.
    pub fn mean(&self) -> Macros {
        if self.count == 0 {
            return Macros::default();
        }
        let n = self.count as f64;
        Macros {
            carb: self.sums.carb / n,
            prot: self.sums.prot / n,
            fat: self.sums.fat / n,
        }
    }
}
