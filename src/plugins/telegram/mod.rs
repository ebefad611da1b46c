mod callback;
mod command;

use std::sync::Arc;

use command::Command;
use teloxide::{
  Bot,
  dispatching::{Dispatcher, HandlerExt, UpdateFilterExt},
  prelude::*,
  types::{
    CallbackQuery, ChatId, InlineKeyboardMarkup, Message, MessageId,
    ParseMode, Update,
  },
};

use crate::{prelude::*, state::AppState, sv::donation::Confirmed, utils};

pub struct Plugin;

#[async_trait::async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    run_bot(app).await;
    Ok(())
  }
}

pub async fn run_bot(app: Arc<AppState>) {
  info!("Starting Telegram bot...");

  let bot = app.bot.clone();

  let handler = teloxide::dptree::entry()
    .branch(Update::filter_message().filter_command::<Command>().endpoint({
      let app = app.clone();
      move |bot: Bot, msg: Message, cmd: Command| {
        let app = app.clone();
        let bot = ReplyBot::from_message(bot, &msg);
        command::handle(app, bot, cmd)
      }
    }))
    .branch(Update::filter_message().endpoint({
      // plain text only reaches the goal-creation wizard
      let app = app.clone();
      move |bot: Bot, msg: Message| {
        let app = app.clone();
        let text = msg.text().map(str::to_string);
        let bot = ReplyBot::from_message(bot, &msg);
        async move {
          match text {
            Some(text) => command::handle_wizard_text(app, bot, text).await,
            None => Ok(()),
          }
        }
      }
    }))
    .branch(Update::filter_callback_query().endpoint({
      let app = app.clone();
      move |bot: Bot, query: CallbackQuery| {
        let app = app.clone();
        callback_handle(app, bot, query)
      }
    }));

  Dispatcher::builder(bot, handler).build().dispatch().await;
}

async fn callback_handle(
  app: Arc<AppState>,
  bot: Bot,
  query: CallbackQuery,
) -> ResponseResult<()> {
  if let Some(data) = query.data.clone()
    && let Some(msg) = query.message.as_ref()
  {
    let bot = ReplyBot::from_query(bot, &query, msg.chat().id, msg.id());

    // answer callback to remove loading state
    bot.inner.answer_callback_query(query.id.clone()).await?;

    callback::handle(app, bot, &data).await
  } else {
    Ok(())
  }
}

/// Thanks the donor once a payment settles and shows the refreshed goal.
/// Shared by the webhook handler and the reconciliation pass.
pub async fn send_donation_receipt(app: &AppState, confirmed: &Confirmed) {
  let amount = utils::format_amount(
    confirmed.donation.amount,
    &confirmed.donation.currency,
  );

  let text = match &confirmed.goal {
    Some(goal) => format!(
      "✅ Your donation of <b>{}</b> toward <b>{}</b> has been received!\n\n\
       {}\n{} raised of {}",
      amount,
      goal.title,
      utils::progress_bar(goal.current_amount, goal.target_amount),
      utils::format_amount(goal.current_amount, &confirmed.donation.currency),
      utils::format_amount(goal.target_amount, &confirmed.donation.currency),
    ),
    None => format!("✅ Your donation of <b>{}</b> has been received!", amount),
  };

  let donor = ChatId(confirmed.donation.user_tg_id);
  if let Err(err) = app
    .bot
    .send_message(donor, text)
    .parse_mode(ParseMode::Html)
    .await
  {
    warn!("receipt for {} not delivered: {err}", confirmed.donation.id);
  }
}

#[derive(Debug, Clone)]
pub struct ReplyBot {
  inner: Bot,
  pub user_id: i64,
  pub chat_id: ChatId,
  pub message_id: MessageId,
  pub username: Option<String>,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
}

impl ReplyBot {
  fn from_message(inner: Bot, msg: &Message) -> Self {
    let from = msg.from.as_ref();
    Self {
      inner,
      user_id: from.map(|u| u.id.0 as i64).unwrap_or(msg.chat.id.0),
      chat_id: msg.chat.id,
      message_id: msg.id,
      username: from.and_then(|u| u.username.clone()),
      first_name: from.map(|u| u.first_name.clone()),
      last_name: from.and_then(|u| u.last_name.clone()),
    }
  }

  fn from_query(
    inner: Bot,
    query: &CallbackQuery,
    chat_id: ChatId,
    message_id: MessageId,
  ) -> Self {
    Self {
      inner,
      user_id: query.from.id.0 as i64,
      chat_id,
      message_id,
      username: query.from.username.clone(),
      first_name: Some(query.from.first_name.clone()),
      last_name: query.from.last_name.clone(),
    }
  }

  async fn reply_html(
    &self,
    text: impl Into<String>,
  ) -> ResponseResult<Message> {
    self
      .inner
      .send_message(self.chat_id, text.into())
      .parse_mode(ParseMode::Html)
      .await
  }

  async fn reply_with_keyboard(
    &self,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
  ) -> ResponseResult<Message> {
    self
      .inner
      .send_message(self.chat_id, text.into())
      .parse_mode(ParseMode::Html)
      .reply_markup(keyboard)
      .await
  }

  pub async fn edit_with_keyboard(
    &self,
    text: impl Into<String>,
    keyboard: InlineKeyboardMarkup,
  ) -> ResponseResult<()> {
    self
      .inner
      .edit_message_text(self.chat_id, self.message_id, text.into())
      .parse_mode(ParseMode::Html)
      .reply_markup(keyboard)
      .await?;
    Ok(())
  }
}
