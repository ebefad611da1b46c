use std::sync::Arc;

use teloxide::{
  prelude::*,
  types::{InlineKeyboardButton, InlineKeyboardMarkup},
};

use super::ReplyBot;
use crate::{
  prelude::*,
  state::AppState,
  sv::cryptobot::NANO_USDT,
  utils,
};

/// Callback data enum - provides type-safe callback handling
#[derive(Debug, Clone, PartialEq)]
pub enum Callback {
  Donate(i64),
  Progress,
  Back,
}

impl Callback {
  pub fn to_data(&self) -> String {
    match self {
      Callback::Donate(nano) => format!("donate:{}", nano),
      Callback::Progress => "progress".to_string(),
      Callback::Back => "back".to_string(),
    }
  }

  pub fn from_data(data: &str) -> Option<Self> {
    match data {
      "progress" => Some(Callback::Progress),
      "back" => Some(Callback::Back),
      _ if data.starts_with("donate:") => {
        data[7..].parse().ok().map(Callback::Donate)
      }
      _ => None,
    }
  }
}

pub fn main_menu(presets: &[i64], currency: &str) -> InlineKeyboardMarkup {
  let mut rows: Vec<Vec<InlineKeyboardButton>> = vec![
    presets
      .iter()
      .map(|&nano| {
        InlineKeyboardButton::callback(
          format!("{} {}", nano / NANO_USDT, currency),
          Callback::Donate(nano).to_data(),
        )
      })
      .collect(),
  ];

  rows.push(vec![InlineKeyboardButton::callback(
    "📊 Goal Progress",
    Callback::Progress.to_data(),
  )]);

  InlineKeyboardMarkup::new(rows)
}

fn back_keyboard() -> InlineKeyboardMarkup {
  InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
    "« Back to Menu",
    Callback::Back.to_data(),
  )]])
}

/// Progress view for the active goal; shared by /goal and the Progress
/// button. Aggregates are computed from donations at call time.
pub(super) async fn goal_overview(app: &AppState) -> Result<String> {
  let sv = app.sv();

  let Some(goal) = sv.goal.active().await? else {
    return Ok(
      "There is no active fundraising goal right now.\nCheck back later!"
        .into(),
    );
  };

  let donations = sv.goal.donation_count().await?;
  let donors = sv.goal.donor_count().await?;
  let currency = &app.config.currency;

  Ok(format!(
    "🎯 <b>{}</b>\n{}\n\n{}\n<b>{}</b> raised of <b>{}</b>\n\
     {} donation(s) from {} donor(s)\nStarted {}",
    goal.title,
    goal.description,
    utils::progress_bar(goal.current_amount, goal.target_amount),
    utils::format_amount(goal.current_amount, currency),
    utils::format_amount(goal.target_amount, currency),
    donations,
    donors,
    utils::format_date(goal.created_at),
  ))
}

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  data: &str,
) -> ResponseResult<()> {
  let Some(callback) = Callback::from_data(data) else {
    return Ok(());
  };

  match callback {
    Callback::Donate(nano) => {
      super::command::start_donation(&app, &bot, nano).await?;
    }
    Callback::Progress => match goal_overview(&app).await {
      Ok(text) => {
        bot.edit_with_keyboard(text, back_keyboard()).await?;
      }
      Err(err) => {
        error!("progress view failed: {err}");
        bot
          .edit_with_keyboard(
            format!("❌ {}", err.user_message()),
            back_keyboard(),
          )
          .await?;
      }
    },
    Callback::Back => {
      bot
        .edit_with_keyboard(
          super::command::WELCOME,
          main_menu(&app.config.donation_presets, &app.config.currency),
        )
        .await?;
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn callback_data_round_trips() {
    for callback in [
      Callback::Donate(5 * NANO_USDT),
      Callback::Progress,
      Callback::Back,
    ] {
      assert_eq!(
        Callback::from_data(&callback.to_data()),
        Some(callback.clone())
      );
    }
  }

  #[test]
  fn unknown_callback_data_is_ignored() {
    assert_eq!(Callback::from_data("donate:abc"), None);
    assert_eq!(Callback::from_data("nonsense"), None);
  }
}
