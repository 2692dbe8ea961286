//! Telegram-HTML rendering of recipes, lists and status messages.
//!
//! Every string that came from an upstream API or from the user goes through
//! [`escape`] before it is placed in markup.

use crate::catalog::Lookup;
use crate::meal::{Ingredient, Recipe, Summary};

/// Telegram rejects longer message texts.
pub const MESSAGE_LIMIT: usize = 4096;
const BLURB_CHARS: usize = 60;

pub const NO_RECIPE_TO_REMIX: &str = "No recipe to remix!";
pub const REMIX_LOADING: &str =
    "✨ ChefBot is remixing your recipe... Hang tight for a tasty twist! 🍳🪄";
pub const REMIX_FAILED: &str =
    "😅 Oops! Something went wrong while remixing your recipe. Please try again in a moment.";
pub const NO_FAVORITES: &str = "No saved recipes yet.";
pub const NOT_ON_DISPLAY: &str = "That recipe is no longer on display.";

/// Inline buttons attached to a screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyboard {
    None,
    Recipe { ingredients_shown: bool },
    /// One load/delete row per saved name, in list order.
    Favorites(Vec<String>),
    Themes,
}

/// A rendered message: HTML text plus its buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub html: String,
    pub keyboard: Keyboard,
}

impl Screen {
    pub fn text(message: &str) -> Self {
        Screen {
            html: escape(message),
            keyboard: Keyboard::None,
        }
    }

    /// True for the empty favorites state, which shows no entries.
    pub fn is_hidden_favorites(&self) -> bool {
        self.keyboard == Keyboard::None && self.html == NO_FAVORITES
    }
}

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Escapes as much of `text` as fits in `max` chars without splitting an entity.
fn escape_within(text: &str, max: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let piece = escape(c.encode_utf8(&mut [0; 4]));
        let width = piece.chars().count();
        if used + width > max {
            break;
        }
        used += width;
        out.push_str(&piece);
    }
    out
}

fn link(name: &str, href: Option<&str>) -> String {
    match href {
        Some(href) => format!("<a href=\"{}\">{}</a>", escape(href), escape(name)),
        None => escape(name),
    }
}

pub fn ingredient_list(ingredients: &[Ingredient]) -> String {
    ingredients
        .iter()
        .map(|ingredient| format!("• {}", escape(&ingredient.line())))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escaped instructions with every line break kept as a visual break.
pub fn instructions(text: &str) -> String {
    escape(&text.replace("\r\n", "\n"))
}

pub fn recipe(recipe: &Recipe, ingredients_shown: bool) -> Screen {
    let mut head = format!("<b>{}</b>", link(recipe.name(), recipe.thumb()));
    if ingredients_shown {
        head.push_str("\n\n<b>Ingredients:</b>\n");
        head.push_str(&ingredient_list(&recipe.ingredients()));
    }
    head.push_str("\n\n<b>Instructions:</b>\n");

    let mut body = instructions(recipe.instructions());
    let room = MESSAGE_LIMIT.saturating_sub(head.chars().count());
    if body.chars().count() > room {
        body = escape_within(&recipe.instructions().replace("\r\n", "\n"), room.saturating_sub(1));
        body.push('…');
    }

    Screen {
        html: head + &body,
        keyboard: Keyboard::Recipe { ingredients_shown },
    }
}

fn bounded_list(title: &str, lines: Vec<String>) -> Screen {
    let mut html = format!("<b>{}</b>", escape(title));
    let total = lines.len();
    for (shown, line) in lines.into_iter().enumerate() {
        let more = format!("\n…and {} more", total - shown);
        if html.chars().count() + line.chars().count() + 1 + more.chars().count() > MESSAGE_LIMIT {
            html.push_str(&more);
            break;
        }
        html.push('\n');
        html.push_str(&line);
    }
    Screen {
        html,
        keyboard: Keyboard::None,
    }
}

pub fn summaries(title: &str, items: &[Summary]) -> Screen {
    let lines = items
        .iter()
        .map(|item| {
            let mut line = format!("• <b>{}</b>", link(&item.name, item.thumb.as_deref()));
            if let Some(id) = &item.id {
                line.push_str(&format!(" <code>{}</code>", escape(id)));
            }
            if let Some(blurb) = &item.blurb {
                line.push_str(&format!(" - {}...", escape(truncate_chars(blurb, BLURB_CHARS))));
            }
            line
        })
        .collect();
    bounded_list(title, lines)
}

pub fn names(title: &str, names: &[String]) -> Screen {
    bounded_list(title, names.iter().map(|name| format!("• {}", escape(name))).collect())
}

pub fn favorites(saved: &[String]) -> Screen {
    if saved.is_empty() {
        return Screen::text(NO_FAVORITES);
    }
    Screen {
        html: "<b>Saved Recipes:</b>".to_string(),
        keyboard: Keyboard::Favorites(saved.to_vec()),
    }
}

pub fn remix_result(text: &str) -> Screen {
    Screen {
        html: format!("<b>Remix</b>\n\n{}", escape(text)),
        keyboard: Keyboard::None,
    }
}

pub fn theme_picker() -> Screen {
    Screen {
        html: "Pick a remix theme:".to_string(),
        keyboard: Keyboard::Themes,
    }
}

pub fn loading_text(lookup: &Lookup) -> &'static str {
    match lookup {
        Lookup::CategoryNames => "Loading categories...",
        Lookup::AreaNames => "Loading areas...",
        Lookup::IngredientNames => "Loading ingredients...",
        _ => "Loading...",
    }
}

pub fn failure_text(lookup: &Lookup) -> &'static str {
    match lookup {
        Lookup::Random | Lookup::ByName(_) => "Sorry, couldn't load a recipe.",
        Lookup::ById(_) => "Sorry, couldn't load meal details.",
        Lookup::Categories | Lookup::CategoryNames => "Sorry, couldn't load categories.",
        Lookup::AreaNames => "Sorry, couldn't load areas.",
        Lookup::IngredientNames => "Sorry, couldn't load ingredients.",
        Lookup::ByFirstLetter(_)
        | Lookup::ByIngredient(_)
        | Lookup::ByCategory(_)
        | Lookup::ByArea(_) => "Sorry, couldn't load meals.",
    }
}

/// Hint for a parameterized lookup sent without its parameter.
pub fn usage_text(lookup: &Lookup) -> &'static str {
    match lookup {
        Lookup::ByName(_) => "Usage: /search <meal name>",
        Lookup::ById(_) => "Usage: /id <meal id>",
        Lookup::ByFirstLetter(_) => "Usage: /letter <first letter>",
        Lookup::ByIngredient(_) => "Usage: /ingredient <main ingredient>",
        Lookup::ByCategory(_) => "Usage: /category <category>",
        Lookup::ByArea(_) => "Usage: /area <area>",
        _ => "",
    }
}

pub fn not_found_text(lookup: &Lookup) -> String {
    match lookup {
        Lookup::Random => "No recipe found.".to_string(),
        Lookup::ByName(s) => format!("No recipe found for \"{s}\"."),
        Lookup::ById(s) => format!("No meal found with ID \"{s}\"."),
        Lookup::ByFirstLetter(s) => format!("No meals found starting with \"{s}\"."),
        Lookup::ByIngredient(s) => format!("No meals found with ingredient \"{s}\"."),
        Lookup::ByCategory(s) => format!("No meals found in category \"{s}\"."),
        Lookup::ByArea(s) => format!("No meals found from area \"{s}\"."),
        Lookup::Categories | Lookup::CategoryNames => "No categories found.".to_string(),
        Lookup::AreaNames => "No areas found.".to_string(),
        Lookup::IngredientNames => "No ingredients found.".to_string(),
    }
}

pub fn list_title(lookup: &Lookup) -> String {
    match lookup {
        Lookup::ByFirstLetter(s) => format!("Meals starting with \"{}\":", s.to_uppercase()),
        Lookup::ByIngredient(s) => format!("Meals with \"{s}\":"),
        Lookup::ByCategory(s) => format!("Meals in category \"{s}\":"),
        Lookup::ByArea(s) => format!("Meals from \"{s}\":"),
        Lookup::Categories => "Meal Categories:".to_string(),
        Lookup::CategoryNames => "All Categories:".to_string(),
        Lookup::AreaNames => "All Areas (Cuisines):".to_string(),
        Lookup::IngredientNames => "All Ingredients:".to_string(),
        Lookup::Random | Lookup::ByName(_) | Lookup::ById(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meal::recipe_from;
    use serde_json::json;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x")</script> & co"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; co"
        );
    }

    #[test]
    fn upstream_markup_never_reaches_output() {
        let recipe = recipe_from(json!({
            "strMeal": "<b>Bold</b>",
            "strMealThumb": "https://img/x.jpg\"><script>",
            "strInstructions": "<img src=x onerror=alert(1)>",
            "strIngredient1": "<i>Egg</i>",
        }));
        let screen = super::recipe(&recipe, true);
        assert!(!screen.html.contains("<script>"));
        assert!(!screen.html.contains("<img"));
        assert!(!screen.html.contains("<i>"));
        assert!(screen.html.contains("&lt;b&gt;Bold&lt;/b&gt;"));
    }

    #[test]
    fn ingredients_hidden_until_toggled() {
        let recipe = recipe_from(json!({
            "strMeal": "Toast",
            "strIngredient1": "Bread",
            "strInstructions": "Toast it.",
        }));
        let hidden = super::recipe(&recipe, false);
        assert!(!hidden.html.contains("Bread"));
        assert_eq!(hidden.keyboard, Keyboard::Recipe { ingredients_shown: false });

        let shown = super::recipe(&recipe, true);
        assert!(shown.html.contains("• Bread"));
        assert_eq!(shown.keyboard, Keyboard::Recipe { ingredients_shown: true });
    }

    #[test]
    fn windows_line_breaks_become_single_breaks() {
        assert_eq!(instructions("Boil.\r\nServe.\nEat."), "Boil.\nServe.\nEat.");
    }

    #[test]
    fn long_instructions_fit_the_message_limit() {
        let recipe = recipe_from(json!({
            "strMeal": "Epic",
            "strInstructions": "Stir & wait. ".repeat(800),
        }));
        let screen = super::recipe(&recipe, false);
        assert!(screen.html.chars().count() <= MESSAGE_LIMIT);
        assert!(screen.html.ends_with('…'));
        let tail = &screen.html[screen.html.rfind('&').unwrap()..];
        assert!(tail.starts_with("&amp;"));
    }

    #[test]
    fn category_blurbs_are_cut_at_sixty_chars() {
        let items = vec![Summary {
            name: "Beef".into(),
            thumb: None,
            id: None,
            blurb: Some("x".repeat(100)),
        }];
        let screen = summaries("Meal Categories:", &items);
        assert!(screen.html.contains(&format!(" - {}...", "x".repeat(60))));
        assert!(!screen.html.contains(&"x".repeat(61)));
    }

    #[test]
    fn meal_summaries_show_ids() {
        let items = vec![Summary {
            name: "Sushi".into(),
            thumb: Some("https://img/s.jpg".into()),
            id: Some("53065".into()),
            blurb: None,
        }];
        let screen = summaries("Meals from \"Japanese\":", &items);
        assert_eq!(
            screen.html,
            "<b>Meals from &quot;Japanese&quot;:</b>\n• <b><a href=\"https://img/s.jpg\">Sushi</a></b> <code>53065</code>"
        );
    }

    #[test]
    fn huge_lists_are_cut_with_a_remainder_line() {
        let many: Vec<String> = (0..1000).map(|i| format!("Ingredient number {i}")).collect();
        let screen = names("All Ingredients:", &many);
        assert!(screen.html.chars().count() <= MESSAGE_LIMIT);
        assert!(screen.html.contains("more"));
        assert!(screen.html.contains("• Ingredient number 0\n"));
    }

    #[test]
    fn empty_favorites_are_hidden() {
        assert!(favorites(&[]).is_hidden_favorites());
        let shown = favorites(&["Soup".to_string()]);
        assert!(!shown.is_hidden_favorites());
        assert_eq!(shown.keyboard, Keyboard::Favorites(vec!["Soup".into()]));
    }

    #[test]
    fn not_found_messages_quote_the_term() {
        assert_eq!(
            not_found_text(&Lookup::ByCategory("Nope".into())),
            "No meals found in category \"Nope\"."
        );
        assert_eq!(
            list_title(&Lookup::ByFirstLetter("b".into())),
            "Meals starting with \"B\":"
        );
    }
}
