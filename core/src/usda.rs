use serde::Deserialize;

use crate::models::NutritionFacts;

const ENERGY: (i64, &str) = (1008, "208");
const PROTEIN: (i64, &str) = (1003, "203");
const CARBS: (i64, &str) = (1005, "205");
const FAT: (i64, &str) = (1004, "204");

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub foods: Vec<FoodData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodData {
    pub description: Option<String>,
    #[serde(default)]
    pub food_nutrients: Vec<FoodNutrient>,
    pub label_nutrients: Option<LabelNutrients>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodNutrient {
    pub nutrient_id: Option<i64>,
    pub nutrient_number: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelNutrients {
    pub calories: Option<LabelValue>,
    pub protein: Option<LabelValue>,
    pub total_carbohydrate: Option<LabelValue>,
    pub total_fat: Option<LabelValue>,
}

#[derive(Debug, Deserialize)]
pub struct LabelValue {
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Macros {
    calories: Option<f64>,
    protein: Option<f64>,
    carbs: Option<f64>,
    fat: Option<f64>,
}

impl Macros {
    fn any_present(&self) -> bool {
        [self.calories, self.protein, self.carbs, self.fat]
            .iter()
            .any(|v| is_present(*v))
    }
}

fn is_present(value: Option<f64>) -> bool {
    value.is_some_and(|v| v != 0.0)
}

fn nutrient_value(nutrients: &[FoodNutrient], (id, number): (i64, &str)) -> Option<f64> {
    nutrients
        .iter()
        .find(|n| n.nutrient_id == Some(id) || n.nutrient_number.as_deref() == Some(number))
        .and_then(|n| n.value)
}

fn label_value(label: Option<&LabelValue>) -> Option<f64> {
    label.and_then(|l| l.value)
}

/// Macros from `foodNutrients`, with missing or zero values filled from the
/// branded `labelNutrients` block.
fn extract_macros(food: &FoodData) -> Macros {
    let mut macros = Macros {
        calories: nutrient_value(&food.food_nutrients, ENERGY),
        protein: nutrient_value(&food.food_nutrients, PROTEIN),
        carbs: nutrient_value(&food.food_nutrients, CARBS),
        fat: nutrient_value(&food.food_nutrients, FAT),
    };
    if let Some(ref label) = food.label_nutrients {
        let fill = |current: Option<f64>, fallback: Option<&LabelValue>| {
            if is_present(current) {
                current
            } else {
                label_value(fallback)
            }
        };
        macros.calories = fill(macros.calories, label.calories.as_ref());
        macros.protein = fill(macros.protein, label.protein.as_ref());
        macros.carbs = fill(macros.carbs, label.total_carbohydrate.as_ref());
        macros.fat = fill(macros.fat, label.total_fat.as_ref());
    }
    macros
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole(value: Option<f64>) -> u32 {
    value.unwrap_or(0.0).round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Capitalize the first letter of every word, lowercase the rest.
#[must_use]
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if prev_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_alpha = c.is_alphabetic();
    }
    out
}

/// Pick the first food with any macro present, else the first food.
/// The record is named after the query, not the USDA description.
#[must_use]
pub fn best_match(query: &str, foods: &[FoodData]) -> Option<NutritionFacts> {
    let first = foods.first()?;
    let macros = foods
        .iter()
        .map(extract_macros)
        .find(Macros::any_present)
        .unwrap_or_else(|| extract_macros(first));

    Some(NutritionFacts {
        name: title_case(query.trim()),
        calories: whole(macros.calories),
        protein_g: whole(macros.protein),
        carbs_g: whole(macros.carbs),
        fat_g: whole(macros.fat),
    })
}
