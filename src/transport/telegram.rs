use crate::dialog::{Dialog, Reply};
use crate::utils::{self, TELEGRAM_MESSAGE_LIMIT};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, KeyboardButton, KeyboardMarkup, ParseMode};
use tracing::{error, info, warn};

const TEXT_ONLY_HINT: &str = "✍️ Я понимаю только текст. Напиши сообщение или выбери действие из меню.";

/// Session key of a Telegram user; falls back to the chat id for anonymous senders
fn user_key(msg: &Message) -> String {
    msg.from.as_ref().map_or_else(
        || format!("tg:chat{}", msg.chat.id.0),
        |user| format!("tg:{}", user.id.0),
    )
}

fn keyboard(rows: &[Vec<String>]) -> KeyboardMarkup {
    KeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|label| KeyboardButton::new(label.clone()))
            .collect::<Vec<_>>()
    }))
    .resize_keyboard()
}

/// Sends markdown `text` split into Telegram-sized HTML messages.
///
/// The keyboard, if any, is attached to the last part.
async fn send_long_message(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    buttons: Option<&[Vec<String>]>,
) -> Result<()> {
    // Split raw markdown first so every part is formatted on its own
    let parts = utils::split_long_message(text, TELEGRAM_MESSAGE_LIMIT);
    let last = parts.len().saturating_sub(1);

    for (idx, part) in parts.iter().enumerate() {
        let formatted = utils::format_text(part);
        let markup = buttons.filter(|_| idx == last).map(keyboard);
        utils::retry_send(|| {
            let mut request = bot
                .send_message(chat_id, formatted.clone())
                .parse_mode(ParseMode::Html);
            if let Some(markup) = markup.clone() {
                request = request.reply_markup(markup);
            }
            async move { request.await.map_err(anyhow::Error::from) }
        })
        .await?;
    }

    Ok(())
}

async fn send_file(bot: &Bot, chat_id: ChatId, path: &Path, cleanup: bool) -> Result<()> {
    let sent = utils::retry_send(|| {
        let request = bot.send_document(chat_id, InputFile::file(path.to_path_buf()));
        async move { request.await.map_err(anyhow::Error::from) }
    })
    .await;

    // Generated files are removed whether or not delivery succeeded
    if cleanup {
        remove_generated(path).await;
    }
    sent.map(|_| ())
}

async fn remove_generated(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), "Failed to remove generated file: {e}");
    }
}

async fn deliver(bot: &Bot, chat_id: ChatId, replies: Vec<Reply>) -> Result<()> {
    for reply in replies {
        match reply {
            Reply::Text { body, buttons } => {
                send_long_message(bot, chat_id, &body, buttons.as_deref()).await?;
            }
            Reply::File { path, cleanup } => send_file(bot, chat_id, &path, cleanup).await?,
        }
    }
    Ok(())
}

async fn handle_text(bot: Bot, msg: Message, dialog: Arc<Dialog>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return respond(());
    };
    let user = user_key(&msg);
    let replies = dialog.handle(&user, text).await;

    if let Err(e) = deliver(&bot, msg.chat.id, replies).await {
        error!(%user, "Failed to deliver replies: {e:#}");
    }
    respond(())
}

async fn handle_other(bot: Bot, msg: Message) -> ResponseResult<()> {
    if let Err(e) = bot.send_message(msg.chat.id, TEXT_ONLY_HINT).await {
        error!("Failed to send text-only hint: {e}");
    }
    respond(())
}

fn schema() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(handle_text))
        .branch(dptree::endpoint(handle_other))
}

/// Runs long polling until ctrl-c
pub async fn run(token: String, dialog: Arc<Dialog>) {
    let bot = Bot::new(token);
    info!("Telegram bot is running...");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![dialog])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Telegram bot stopped.");
}
