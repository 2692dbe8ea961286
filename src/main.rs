use dotenv::dotenv;
use std::str::FromStr;
use std::sync::Arc;
use teloxide::dispatching::*;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardButtonKind, InlineKeyboardMarkup, MessageId, ParseMode,
};
use teloxide::{prelude::*, utils::command::BotCommands};

mod catalog;
mod config;
mod controller;
mod favorites;
mod meal;
mod remix;
mod render;
mod session;
#[cfg(test)]
mod test_support;

use catalog::Lookup;
use controller::App;
use remix::RemixTheme;
use render::{Keyboard, Screen};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
enum Command {
    #[command(description = "Display this text.")]
    Help,
    #[command(description = "Show a random recipe and your saved recipes.")]
    Start,
    #[command(description = "Show a random recipe.")]
    Random,
    #[command(description = "Find a recipe by name.")]
    Search(String),
    #[command(description = "Show a recipe by its meal id.")]
    Id(String),
    #[command(description = "List meals starting with a letter.")]
    Letter(String),
    #[command(description = "List meals with a main ingredient.")]
    Ingredient(String),
    #[command(description = "List meals of a category.")]
    Category(String),
    #[command(description = "List meals of an area (cuisine).")]
    Area(String),
    #[command(description = "Show meal categories with descriptions.")]
    Categories,
    #[command(description = "List all category names.")]
    CategoryList,
    #[command(description = "List all areas.")]
    AreaList,
    #[command(description = "List ingredients.")]
    IngredientList,
    #[command(description = "Show your saved recipes.")]
    Favorites,
    #[command(description = "Save the current recipe.")]
    Save,
    #[command(description = "Remove a saved recipe by name.")]
    Delete(String),
    #[command(description = "Remix the current recipe, e.g. /remix vegan.")]
    Remix(String),
}

impl Command {
    fn lookup(self) -> Option<Lookup> {
        let term = |s: String| s.trim().to_string();
        Some(match self {
            Command::Random => Lookup::Random,
            Command::Search(s) => Lookup::ByName(term(s)),
            Command::Id(s) => Lookup::ById(term(s)),
            Command::Letter(s) => Lookup::ByFirstLetter(term(s)),
            Command::Ingredient(s) => Lookup::ByIngredient(term(s)),
            Command::Category(s) => Lookup::ByCategory(term(s)),
            Command::Area(s) => Lookup::ByArea(term(s)),
            Command::Categories => Lookup::Categories,
            Command::CategoryList => Lookup::CategoryNames,
            Command::AreaList => Lookup::AreaNames,
            Command::IngredientList => Lookup::IngredientNames,
            _ => return None,
        })
    }
}

/// Payload of an inline button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    ToggleIngredients,
    Save,
    LoadFavorite(usize),
    DeleteFavorite(usize),
    Remix(RemixTheme),
}

impl Action {
    fn data(self) -> String {
        match self {
            Action::ToggleIngredients => "ingredients".to_string(),
            Action::Save => "save".to_string(),
            Action::LoadFavorite(i) => format!("fav:load:{}", i),
            Action::DeleteFavorite(i) => format!("fav:del:{}", i),
            Action::Remix(theme) => format!("remix:{}", theme.slug()),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let index = |i: &str| i.parse::<usize>().map_err(|e| e.to_string());
        match data.split(':').collect::<Vec<_>>().as_slice() {
            ["ingredients"] => Ok(Action::ToggleIngredients),
            ["save"] => Ok(Action::Save),
            ["fav", "load", i] => Ok(Action::LoadFavorite(index(i)?)),
            ["fav", "del", i] => Ok(Action::DeleteFavorite(index(i)?)),
            ["remix", slug] => Ok(Action::Remix(slug.parse()?)),
            _ => Err(format!("unknown button {:?}", data)),
        }
    }
}

fn button(label: &str, action: Action) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(label, action.data())
}

fn markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = match keyboard {
        Keyboard::None => Vec::new(),
        Keyboard::Recipe { ingredients_shown } => {
            let toggle = if *ingredients_shown {
                "🍽 Hide Ingredients"
            } else {
                "🍽 Show Ingredients"
            };
            vec![vec![
                button(toggle, Action::ToggleIngredients),
                button("🔖 Save Recipe", Action::Save),
            ]]
        }
        Keyboard::Favorites(names) => names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                vec![
                    button(name, Action::LoadFavorite(i)),
                    button("Delete", Action::DeleteFavorite(i)),
                ]
            })
            .collect(),
        Keyboard::Themes => RemixTheme::ALL
            .chunks(2)
            .map(|pair| {
                pair.iter()
                    .map(|theme| button(theme.phrase(), Action::Remix(*theme)))
                    .collect()
            })
            .collect(),
    };
    InlineKeyboardMarkup::new(rows)
}

/// Name on the favorites row holding the pressed button.
fn favorite_row_name(message: &Message, data: &str) -> Option<String> {
    message
        .reply_markup()?
        .inline_keyboard
        .iter()
        .find(|row| {
            row.iter().any(|b| {
                matches!(&b.kind, InlineKeyboardButtonKind::CallbackData(d) if d == data)
            })
        })?
        .first()
        .map(|b| b.text.clone())
}

async fn send(bot: &Bot, chat: ChatId, screen: Screen) -> Result<Message, teloxide::RequestError> {
    let request = bot.send_message(chat, screen.html).parse_mode(ParseMode::Html);
    match screen.keyboard {
        Keyboard::None => request.await,
        keyboard => request.reply_markup(markup(&keyboard)).await,
    }
}

async fn edit(
    bot: &Bot,
    chat: ChatId,
    message: MessageId,
    screen: Screen,
) -> Result<Message, teloxide::RequestError> {
    bot.edit_message_text(chat, message, screen.html)
        .parse_mode(ParseMode::Html)
        .reply_markup(markup(&screen.keyboard))
        .await
}

#[tokio::main]
async fn main() {
    // Load all env variables from .env file.
    dotenv().ok();
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();
    log::info!("Starting bot...");

    let config = config::Config::load();
    let app = match App::new(&config) {
        Ok(app) => Arc::new(app),
        Err(e) => {
            log::error!("Failed to set up the bot: {}", e);
            std::process::exit(1);
        }
    };

    let bot = Bot::from_env();
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        log::warn!("Could not register the command list: {}", e);
    }

    let commands = Update::filter_message()
        .filter_command::<Command>()
        .branch(dptree::filter_map(Command::lookup).endpoint(show_lookup))
        .branch(dptree::case![Command::Help].endpoint(help))
        .branch(dptree::case![Command::Start].endpoint(start))
        .branch(dptree::case![Command::Favorites].endpoint(show_favorites))
        .branch(dptree::case![Command::Save].endpoint(save_current))
        .branch(dptree::case![Command::Delete(name)].endpoint(delete_favorite))
        .branch(dptree::case![Command::Remix(theme)].endpoint(remix));
    let handler = dptree::entry()
        .branch(commands)
        .branch(Update::filter_callback_query().endpoint(press_button));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

async fn run_lookup(bot: &Bot, chat: ChatId, app: &App, lookup: Lookup) -> HandlerResult {
    if let Some(usage) = app.usage(&lookup) {
        send(bot, chat, usage).await?;
        return Ok(());
    }
    let loading = bot
        .send_message(chat, render::loading_text(&lookup))
        .await?;
    let ticket = app.begin(chat.0, loading.id.0);
    match app.lookup(ticket, &lookup).await {
        Some(screen) => {
            edit(bot, chat, loading.id, screen).await?;
        }
        None => {
            bot.delete_message(chat, loading.id).await?;
        }
    }
    Ok(())
}

async fn show_lookup(bot: Bot, msg: Message, app: Arc<App>, lookup: Lookup) -> HandlerResult {
    run_lookup(&bot, msg.chat.id, &app, lookup).await
}

async fn start(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    run_lookup(&bot, msg.chat.id, &app, Lookup::Random).await?;
    let favorites = app.favorites(msg.chat.id.0)?;
    if !favorites.is_hidden_favorites() {
        send(&bot, msg.chat.id, favorites).await?;
    }
    Ok(())
}

async fn show_favorites(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    send(&bot, msg.chat.id, app.favorites(msg.chat.id.0)?).await?;
    Ok(())
}

async fn save_current(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    let screen = app
        .save_current(msg.chat.id.0)?
        .unwrap_or_else(|| Screen::text("Nothing to save yet, fetch a recipe first."));
    send(&bot, msg.chat.id, screen).await?;
    Ok(())
}

async fn delete_favorite(bot: Bot, msg: Message, app: Arc<App>, name: String) -> HandlerResult {
    let screen = app.delete_favorite(msg.chat.id.0, name.trim())?;
    send(&bot, msg.chat.id, screen).await?;
    Ok(())
}

async fn run_remix(bot: &Bot, chat: ChatId, app: &App, theme: RemixTheme) -> HandlerResult {
    let Some(recipe) = app.remix_subject(chat.0) else {
        send(bot, chat, Screen::text(render::NO_RECIPE_TO_REMIX)).await?;
        return Ok(());
    };
    let loading = bot.send_message(chat, render::REMIX_LOADING).await?;
    let screen = app.remix_recipe(&recipe, theme).await;
    edit(bot, chat, loading.id, screen).await?;
    Ok(())
}

async fn remix(bot: Bot, msg: Message, app: Arc<App>, theme: String) -> HandlerResult {
    match theme.parse::<RemixTheme>() {
        Ok(theme) => run_remix(&bot, msg.chat.id, &app, theme).await,
        Err(e) => {
            if !theme.trim().is_empty() {
                log::debug!("{}", e);
            }
            send(&bot, msg.chat.id, render::theme_picker()).await?;
            Ok(())
        }
    }
}

async fn press_button(bot: Bot, q: CallbackQuery, app: Arc<App>) -> HandlerResult {
    let Some(message) = q.regular_message() else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let (chat, message_id) = (message.chat.id, message.id);
    let data = q.data.as_deref().unwrap_or_default();
    let action = match data.parse::<Action>() {
        Ok(action) => action,
        Err(e) => {
            log::warn!("Ignoring button press: {}", e);
            bot.answer_callback_query(q.id.clone()).await?;
            return Ok(());
        }
    };
    log::debug!("Button {:?} pressed in {}", action, chat);

    let mut notice = None;
    match action {
        Action::ToggleIngredients => match app.toggle_ingredients(chat.0, message_id.0) {
            Some(screen) => {
                edit(&bot, chat, message_id, screen).await?;
            }
            None => notice = Some(render::NOT_ON_DISPLAY),
        },
        Action::Save => match app.save_displayed(chat.0, message_id.0)? {
            Some(favorites) => {
                notice = Some("Saved!");
                send(&bot, chat, favorites).await?;
            }
            None => notice = Some(render::NOT_ON_DISPLAY),
        },
        Action::LoadFavorite(i) => match favorite_row_name(message, data)
            .map_or_else(|| app.favorite_at(chat.0, i), |name| Ok(Some(name)))?
        {
            Some(name) => {
                bot.answer_callback_query(q.id.clone()).await?;
                return run_lookup(&bot, chat, &app, Lookup::ByName(name)).await;
            }
            None => notice = Some("That recipe is no longer saved."),
        },
        Action::DeleteFavorite(i) => {
            let name = favorite_row_name(message, data)
                .map_or_else(|| app.favorite_at(chat.0, i), |name| Ok(Some(name)))?;
            if let Some(name) = name {
                let screen = app.delete_favorite(chat.0, &name)?;
                edit(&bot, chat, message_id, screen).await?;
            }
        }
        Action::Remix(theme) => {
            bot.answer_callback_query(q.id.clone()).await?;
            return run_remix(&bot, chat, &app, theme).await;
        }
    }

    let answer = bot.answer_callback_query(q.id.clone());
    match notice {
        Some(text) => answer.text(text).await?,
        None => answer.await?,
    };
    Ok(())
}
