use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::meal::{text, Recipe, Summary};

/// The list-all ingredients endpoint returns several hundred entries.
pub const MAX_INGREDIENT_NAMES: usize = 50;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("request to the recipe API failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("recipe API answered with status {0}")]
    Status(StatusCode),

    #[error("could not decode the recipe API response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One catalog query: the dimension to query and its parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Random,
    ByName(String),
    ById(String),
    ByFirstLetter(String),
    ByIngredient(String),
    ByCategory(String),
    ByArea(String),
    Categories,
    CategoryNames,
    AreaNames,
    IngredientNames,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Detail,
    NameThumbList,
    NameOnlyList,
}

/// Top-level envelope field holding the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Meals,
    Categories,
}

/// Resolved request shape of a [`Lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub path: &'static str,
    pub query: Option<(&'static str, &'a str)>,
    pub field: Field,
    pub mode: RenderMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Recipe(Recipe),
    Summaries(Vec<Summary>),
    Names(Vec<String>),
    NotFound,
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    meals: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    categories: Option<Vec<Map<String, Value>>>,
}

impl Lookup {
    pub fn endpoint(&self) -> Endpoint<'_> {
        use Field::*;
        use RenderMode::*;
        let (path, query, field, mode) = match self {
            Lookup::Random => ("random.php", None, Meals, Detail),
            Lookup::ByName(s) => ("search.php", Some(("s", s.as_str())), Meals, Detail),
            Lookup::ById(s) => ("lookup.php", Some(("i", s.as_str())), Meals, Detail),
            Lookup::ByFirstLetter(s) => ("search.php", Some(("f", s.as_str())), Meals, NameThumbList),
            Lookup::ByIngredient(s) => ("filter.php", Some(("i", s.as_str())), Meals, NameThumbList),
            Lookup::ByCategory(s) => ("filter.php", Some(("c", s.as_str())), Meals, NameThumbList),
            Lookup::ByArea(s) => ("filter.php", Some(("a", s.as_str())), Meals, NameThumbList),
            Lookup::Categories => ("categories.php", None, Categories, NameThumbList),
            Lookup::CategoryNames => ("list.php", Some(("c", "list")), Meals, NameOnlyList),
            Lookup::AreaNames => ("list.php", Some(("a", "list")), Meals, NameOnlyList),
            Lookup::IngredientNames => ("list.php", Some(("i", "list")), Meals, NameOnlyList),
        };
        Endpoint {
            path,
            query,
            field,
            mode,
        }
    }

    /// The user-supplied parameter, if this lookup takes one.
    pub fn term(&self) -> Option<&str> {
        match self {
            Lookup::ByName(s)
            | Lookup::ById(s)
            | Lookup::ByFirstLetter(s)
            | Lookup::ByIngredient(s)
            | Lookup::ByCategory(s)
            | Lookup::ByArea(s) => Some(s),
            _ => None,
        }
    }

    /// Key of the name field for name-only lists.
    fn name_key(&self) -> &'static str {
        match self {
            Lookup::AreaNames => "strArea",
            Lookup::IngredientNames => "strIngredient",
            _ => "strCategory",
        }
    }

    /// Turns a decoded envelope into an outcome. A missing or null result
    /// field counts as zero results.
    fn interpret(&self, envelope: Envelope) -> Outcome {
        let endpoint = self.endpoint();
        let items = match endpoint.field {
            Field::Meals => envelope.meals,
            Field::Categories => envelope.categories,
        }
        .unwrap_or_default();
        if items.is_empty() {
            return Outcome::NotFound;
        }

        match endpoint.mode {
            RenderMode::Detail => items
                .into_iter()
                .next()
                .map(|fields| Outcome::Recipe(Recipe::new(fields)))
                .unwrap_or(Outcome::NotFound),
            RenderMode::NameThumbList => Outcome::Summaries(
                items
                    .iter()
                    .map(|item| match endpoint.field {
                        Field::Categories => Summary::from_category(item),
                        Field::Meals => Summary::from_meal(item),
                    })
                    .collect(),
            ),
            RenderMode::NameOnlyList => {
                let key = self.name_key();
                let limit = match self {
                    Lookup::IngredientNames => MAX_INGREDIENT_NAMES,
                    _ => usize::MAX,
                };
                Outcome::Names(items.iter().take(limit).map(|item| text(item, key)).collect())
            }
        }
    }
}

/// Client for TheMealDB's read-only endpoints.
#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base: String,
}

impl CatalogClient {
    pub fn new(http: Client, base: impl Into<String>) -> Self {
        CatalogClient {
            http,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, lookup: &Lookup) -> RequestBuilder {
        let endpoint = lookup.endpoint();
        let request = self.http.get(format!("{}/{}", self.base, endpoint.path));
        match endpoint.query {
            Some(pair) => request.query(&[pair]),
            None => request,
        }
    }

    #[cfg(test)]
    fn url(&self, lookup: &Lookup) -> Result<Url, CatalogError> {
        Ok(self.request(lookup).build()?.url().clone())
    }

    pub async fn fetch(&self, lookup: &Lookup) -> Result<Outcome, CatalogError> {
        let request = self.request(lookup).build()?;
        log::debug!("Fetching {}", request.url());
        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status));
        }
        let body = response.text().await?;
        let envelope: Envelope = serde_json::from_str(&body)?;
        Ok(lookup.interpret(envelope))
    }
}
