use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::meal::Recipe;

/// Per-chat display state.
#[derive(Debug, Default)]
struct Session {
    generation: u64,
    current: Option<Recipe>,
    /// Message that shows `current`.
    recipe_message: Option<i32>,
    ingredients_shown: bool,
}

/// Issued when a catalog request starts; only the newest ticket of a chat
/// may change what that chat displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub chat: i64,
    pub generation: u64,
    pub message: i32,
}

#[derive(Default)]
pub struct Sessions {
    inner: Mutex<HashMap<i64, Session>>,
}

impl Sessions {
    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Session>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn begin(&self, chat: i64, message: i32) -> Ticket {
        let mut sessions = self.lock();
        let session = sessions.entry(chat).or_default();
        session.generation += 1;
        Ticket {
            chat,
            generation: session.generation,
            message,
        }
    }

    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        self.lock()
            .get(&ticket.chat)
            .is_some_and(|s| s.generation == ticket.generation)
    }

    /// Makes `recipe` the chat's current recipe if `ticket` is still the
    /// newest request. Returns false for stale tickets.
    pub fn show_recipe(&self, ticket: &Ticket, recipe: Recipe) -> bool {
        let mut sessions = self.lock();
        let Some(session) = sessions.get_mut(&ticket.chat) else {
            return false;
        };
        if session.generation != ticket.generation {
            return false;
        }
        session.current = Some(recipe);
        session.recipe_message = Some(ticket.message);
        session.ingredients_shown = false;
        true
    }

    pub fn current(&self, chat: i64) -> Option<Recipe> {
        self.lock().get(&chat).and_then(|s| s.current.clone())
    }

    /// The current recipe, if `message` is the one displaying it.
    pub fn displayed(&self, chat: i64, message: i32) -> Option<Recipe> {
        let sessions = self.lock();
        let session = sessions.get(&chat)?;
        if session.recipe_message != Some(message) {
            return None;
        }
        session.current.clone()
    }

    /// Flips ingredient visibility of the displayed recipe and returns the
    /// recipe with its new visibility.
    pub fn toggle_ingredients(&self, chat: i64, message: i32) -> Option<(Recipe, bool)> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&chat)?;
        if session.recipe_message != Some(message) {
            return None;
        }
        let recipe = session.current.clone()?;
        session.ingredients_shown = !session.ingredients_shown;
        Some((recipe, session.ingredients_shown))
    }
}
