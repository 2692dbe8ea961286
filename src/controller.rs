use std::error::Error;

use reqwest::Client;

use crate::catalog::{CatalogClient, Lookup, Outcome};
use crate::config::Config;
use crate::favorites::{FavoritesStore, StoreError};
use crate::meal::Recipe;
use crate::remix::{RemixClient, RemixTheme};
use crate::render::{self, Screen};
use crate::session::{Sessions, Ticket};

/// Everything a chat interacts with: the two remote APIs, saved favorites
/// and the per-chat display state.
pub struct App {
    catalog: CatalogClient,
    remixer: RemixClient,
    favorites: FavoritesStore,
    sessions: Sessions,
}

impl App {
    pub fn new(config: &Config) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let http = Client::builder().timeout(config.http_timeout).build()?;
        log::info!("Opening favorites at {:?}", config.favorites_db);
        Ok(Self::from_parts(
            CatalogClient::new(http.clone(), config.mealdb_base_url.clone()),
            RemixClient::new(
                http,
                config.openai_base_url.clone(),
                config.openai_api_key.clone(),
                config.remix_model.clone(),
            ),
            FavoritesStore::open(&config.favorites_db)?,
        ))
    }

    pub fn from_parts(catalog: CatalogClient, remixer: RemixClient, favorites: FavoritesStore) -> Self {
        App {
            catalog,
            remixer,
            favorites,
            sessions: Sessions::default(),
        }
    }

    /// Usage hint when a parameterized lookup has a blank parameter.
    pub fn usage(&self, lookup: &Lookup) -> Option<Screen> {
        match lookup.term() {
            Some(term) if term.trim().is_empty() => Some(Screen::text(render::usage_text(lookup))),
            _ => None,
        }
    }

    /// Starts a catalog request whose result will replace `message`.
    pub fn begin(&self, chat: i64, message: i32) -> Ticket {
        self.sessions.begin(chat, message)
    }

    /// Runs `lookup` and renders its result. Returns `None` when a newer
    /// request was started for the same chat in the meantime.
    pub async fn lookup(&self, ticket: Ticket, lookup: &Lookup) -> Option<Screen> {
        if let Some(usage) = self.usage(lookup) {
            return Some(usage);
        }
        let outcome = self.catalog.fetch(lookup).await;
        if !self.sessions.is_latest(&ticket) {
            log::debug!("Dropping stale result of {:?}", lookup);
            return None;
        }

        let screen = match outcome {
            Ok(Outcome::Recipe(recipe)) => {
                let screen = render::recipe(&recipe, false);
                if !self.sessions.show_recipe(&ticket, recipe) {
                    return None;
                }
                screen
            }
            Ok(Outcome::Summaries(items)) => render::summaries(&render::list_title(lookup), &items),
            Ok(Outcome::Names(names)) => render::names(&render::list_title(lookup), &names),
            Ok(Outcome::NotFound) => {
                log::info!("Nothing found for {:?}", lookup);
                Screen::text(&render::not_found_text(lookup))
            }
            Err(e) => {
                log::warn!("Catalog lookup {:?} failed: {}", lookup, e);
                Screen::text(render::failure_text(lookup))
            }
        };
        Some(screen)
    }

    pub fn toggle_ingredients(&self, chat: i64, message: i32) -> Option<Screen> {
        let (recipe, shown) = self.sessions.toggle_ingredients(chat, message)?;
        Some(render::recipe(&recipe, shown))
    }

    pub fn favorites(&self, chat: i64) -> Result<Screen, StoreError> {
        Ok(render::favorites(&self.favorites.list_all(chat)?))
    }

    fn save(&self, chat: i64, recipe: Option<Recipe>) -> Result<Option<Screen>, StoreError> {
        let Some(recipe) = recipe.filter(|r| !r.name().is_empty()) else {
            return Ok(None);
        };
        self.favorites.add(chat, recipe.name())?;
        self.favorites(chat).map(Some)
    }

    /// Saves the chat's current recipe. `None` when there is nothing to save.
    pub fn save_current(&self, chat: i64) -> Result<Option<Screen>, StoreError> {
        self.save(chat, self.sessions.current(chat))
    }

    /// Saves the recipe shown in `message`, if it is still the current one.
    pub fn save_displayed(&self, chat: i64, message: i32) -> Result<Option<Screen>, StoreError> {
        self.save(chat, self.sessions.displayed(chat, message))
    }

    pub fn delete_favorite(&self, chat: i64, name: &str) -> Result<Screen, StoreError> {
        self.favorites.remove(chat, name)?;
        self.favorites(chat)
    }

    pub fn favorite_at(&self, chat: i64, index: usize) -> Result<Option<String>, StoreError> {
        Ok(self.favorites.list_all(chat)?.into_iter().nth(index))
    }

    pub fn remix_subject(&self, chat: i64) -> Option<Recipe> {
        self.sessions.current(chat)
    }

    pub async fn remix_recipe(&self, recipe: &Recipe, theme: RemixTheme) -> Screen {
        match self.remixer.remix(recipe, theme).await {
            Ok(text) => render::remix_result(&text),
            Err(e) => {
                log::warn!("Remix of {:?} failed: {}", recipe.name(), e);
                Screen::text(render::REMIX_FAILED)
            }
        }
    }

    pub async fn remix(&self, chat: i64, theme: RemixTheme) -> Screen {
        match self.remix_subject(chat) {
            Some(recipe) => self.remix_recipe(&recipe, theme).await,
            None => Screen::text(render::NO_RECIPE_TO_REMIX),
        }
    }
}
