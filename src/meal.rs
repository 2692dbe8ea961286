use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Number of numbered ingredient/measure slots in a MealDB record.
pub const INGREDIENT_SLOTS: usize = 20;

/// A meal record exactly as TheMealDB returned it.
///
/// Nothing is validated or normalized: the record is kept as a JSON object so
/// it can be forwarded verbatim to the remix prompt. Accessors read missing or
/// null string fields as empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipe(Map<String, Value>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingredient {
    pub measure: Option<String>,
    pub name: String,
}

/// An entry of a name+thumbnail list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Summary {
    pub name: String,
    pub thumb: Option<String>,
    pub id: Option<String>,
    pub blurb: Option<String>,
}

impl Recipe {
    pub fn new(fields: Map<String, Value>) -> Self {
        Recipe(fields)
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> &str {
        self.field("strMeal").unwrap_or_default()
    }

    pub fn thumb(&self) -> Option<&str> {
        self.field("strMealThumb").filter(|s| !s.trim().is_empty())
    }

    pub fn instructions(&self) -> &str {
        self.field("strInstructions").unwrap_or_default()
    }

    /// Ingredients of slots 1..=20 whose name is non-blank, in slot order.
    pub fn ingredients(&self) -> Vec<Ingredient> {
        (1..=INGREDIENT_SLOTS)
            .filter_map(|i| {
                let name = self.field(&format!("strIngredient{i}"))?;
                if name.trim().is_empty() {
                    return None;
                }
                let measure = self
                    .field(&format!("strMeasure{i}"))
                    .filter(|m| !m.trim().is_empty())
                    .map(str::to_string);
                Some(Ingredient {
                    measure,
                    name: name.to_string(),
                })
            })
            .collect()
    }
}

impl Ingredient {
    pub fn line(&self) -> String {
        match &self.measure {
            Some(measure) => format!("{} {}", measure, self.name),
            None => self.name.clone(),
        }
    }
}

impl Summary {
    pub fn from_meal(item: &Map<String, Value>) -> Self {
        Summary {
            name: text(item, "strMeal"),
            thumb: non_empty(item, "strMealThumb"),
            id: non_empty(item, "idMeal"),
            blurb: None,
        }
    }

    pub fn from_category(item: &Map<String, Value>) -> Self {
        Summary {
            name: text(item, "strCategory"),
            thumb: non_empty(item, "strCategoryThumb"),
            id: None,
            blurb: Some(text(item, "strCategoryDescription")),
        }
    }
}

pub(crate) fn text(item: &Map<String, Value>, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn non_empty(item: &Map<String, Value>, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) fn recipe_from(value: Value) -> Recipe {
    match value {
        Value::Object(fields) => Recipe::new(fields),
        other => panic!("not a JSON object: {other}"),
    }
}
