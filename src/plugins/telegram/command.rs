use std::sync::Arc;

use reqwest::Url;
use teloxide::{
  prelude::*,
  types::{InlineKeyboardButton, InlineKeyboardMarkup},
  utils::command::BotCommands,
};

use super::ReplyBot;
use crate::{
  entity::DonationStatus,
  prelude::*,
  state::AppState,
  sv::cryptobot::NANO_USDT,
  utils,
  wizard::Step,
};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
  Start,
  Help,
  Goal,
  Donate(String),
  NewGoal,
  Cancel,
  Stats,
}

pub(super) const WELCOME: &str = "<b>Welcome to the donation bot!</b>\n\n\
  Pick an amount below to support the current goal, or check its progress \
  first.";

const ADMIN_HELP: &str = "\
<b>📋 Admin Commands</b>

/newgoal - Start the goal-creation wizard (title → description → target)
/cancel - Abort an unfinished wizard
/stats - Show user and donation totals

<b>User Commands:</b>
/goal - Show the active goal and its progress
/donate [amount] - Donate toward the active goal
/help - Show this message";

/// Parses a user-entered amount in whole currency units into nano units.
fn parse_units(text: &str) -> Option<i64> {
  let units: f64 = text.trim().parse().ok()?;
  let nano = (units * NANO_USDT as f64).round() as i64;
  (nano > 0).then_some(nano)
}

pub async fn handle(
  app: Arc<AppState>,
  bot: ReplyBot,
  cmd: Command,
) -> ResponseResult<()> {
  let sv = app.sv();

  if let Err(err) = sv
    .user
    .get_or_create(
      bot.user_id,
      bot.username.as_deref(),
      bot.first_name.as_deref(),
      bot.last_name.as_deref(),
    )
    .await
  {
    warn!("user upsert for {} failed: {err}", bot.user_id);
  }

  match cmd {
    Command::Start => {
      bot
        .reply_with_keyboard(
          WELCOME,
          super::callback::main_menu(
            &app.config.donation_presets,
            &app.config.currency,
          ),
        )
        .await?;
    }
    Command::Help if app.admins.contains(&bot.user_id) => {
      bot.reply_html(ADMIN_HELP).await?;
    }
    Command::Help => {
      bot
        .reply_html(
          "Use /goal to see the current goal and /donate to support it.",
        )
        .await?;
    }
    Command::Goal => match super::callback::goal_overview(&app).await {
      Ok(text) => {
        bot.reply_html(text).await?;
      }
      Err(err) => {
        error!("goal overview failed: {err}");
        bot.reply_html(format!("❌ {}", err.user_message())).await?;
      }
    },
    Command::Donate(arg) if arg.trim().is_empty() => {
      bot
        .reply_with_keyboard(
          "Choose a donation amount:",
          super::callback::main_menu(
            &app.config.donation_presets,
            &app.config.currency,
          ),
        )
        .await?;
    }
    Command::Donate(arg) => match parse_units(&arg) {
      Some(amount) => start_donation(&app, &bot, amount).await?,
      None => {
        bot
          .reply_html("Send a positive amount, e.g. <code>/donate 10</code>")
          .await?;
      }
    },
    Command::NewGoal if app.admins.contains(&bot.user_id) => {
      app.wizard.start(bot.user_id, bot.chat_id.0);
      bot
        .reply_html(
          "🎯 Let's open a new goal. Previous goals will stop accepting \
           donations once it is live.\n\nSend the goal <b>title</b>:",
        )
        .await?;
    }
    Command::Cancel if app.admins.contains(&bot.user_id) => {
      app.wizard.cancel(bot.user_id);
      bot.reply_html("Goal creation cancelled.").await?;
    }
    Command::Stats if app.admins.contains(&bot.user_id) => {
      match stats_text(&app).await {
        Ok(text) => {
          bot.reply_html(text).await?;
        }
        Err(err) => {
          error!("stats failed: {err}");
          bot.reply_html(format!("❌ {}", err.user_message())).await?;
        }
      }
    }
    // admin-only commands are invisible to everyone else
    Command::NewGoal | Command::Cancel | Command::Stats => {}
  }

  Ok(())
}

async fn stats_text(app: &AppState) -> Result<String> {
  let sv = app.sv();

  let users = sv.user.count().await?;
  let goals = sv.goal.all().await?;
  let donations = sv.goal.donation_count().await?;
  let donors = sv.goal.donor_count().await?;

  let active = goals
    .iter()
    .find(|g| g.is_active)
    .map(|g| g.title.as_str())
    .unwrap_or("none");

  Ok(format!(
    "👥 <b>{}</b> registered user(s)\n\
     🎯 <b>{}</b> goal(s), active: <b>{}</b>\n\
     🎁 <b>{}</b> donation(s) from <b>{}</b> donor(s) toward the active goal",
    users,
    goals.len(),
    active,
    donations,
    donors,
  ))
}

/// Routes a plain-text message from an admin into their open wizard draft.
/// Non-admins and admins without a draft fall through silently.
pub async fn handle_wizard_text(
  app: Arc<AppState>,
  bot: ReplyBot,
  text: String,
) -> ResponseResult<()> {
  if !app.admins.contains(&bot.user_id) {
    return Ok(());
  }

  let Some(draft) = app.wizard.get(bot.user_id) else {
    return Ok(());
  };

  match draft.step {
    Step::Title => {
      app.wizard.set_title(bot.user_id, text);
      bot.reply_html("Got it. Now send the goal <b>description</b>:").await?;
    }
    Step::Description => {
      app.wizard.set_description(bot.user_id, text);
      bot
        .reply_html(format!(
          "Now send the <b>target amount</b> in {}:",
          app.config.currency
        ))
        .await?;
    }
    // `Done` means a previous commit failed; a fresh amount retries it
    Step::Amount | Step::Done => match parse_units(&text) {
      Some(amount) => {
        app.wizard.set_amount(bot.user_id, amount);
        commit_goal(&app, &bot).await?;
      }
      None => {
        bot
          .reply_html("Send a positive number, e.g. <code>1000</code>")
          .await?;
      }
    },
  }

  Ok(())
}

/// Commits a completed draft as the new active goal. The draft is cleared on
/// success only, so a failed commit can be retried without restarting.
async fn commit_goal(app: &AppState, bot: &ReplyBot) -> ResponseResult<()> {
  let Some(draft) = app.wizard.get(bot.user_id) else {
    return Ok(());
  };

  let sv = app.sv();
  let title = draft.title.unwrap_or_default();
  let description = draft.description.unwrap_or_default();
  let target = draft.amount.unwrap_or_default();

  match sv.goal.create(&title, &description, target).await {
    Ok(goal) => {
      app.wizard.cancel(bot.user_id);
      info!("goal {} `{}` opened by {}", goal.id, goal.title, bot.user_id);

      bot
        .reply_html(format!(
          "🎯 The goal is live!\n\n<b>{}</b>\n{}\n\nTarget: <b>{}</b>\n\
           Donations now count toward it.",
          goal.title,
          goal.description,
          utils::format_amount(goal.target_amount, &app.config.currency),
        ))
        .await?;
    }
    Err(err) => {
      warn!("goal commit by {} failed: {err}", bot.user_id);
      bot.reply_html(format!("❌ {}", err.user_message())).await?;
    }
  }

  Ok(())
}

/// Issues a provider invoice and records the pending donation under the
/// invoice id, so the webhook can settle it later.
pub(super) async fn start_donation(
  app: &AppState,
  bot: &ReplyBot,
  amount_nano: i64,
) -> ResponseResult<()> {
  let sv = app.sv();

  let goal = match sv.goal.active().await {
    Ok(Some(goal)) => goal,
    Ok(None) => {
      bot.reply_html(Error::NoActiveGoal.user_message()).await?;
      return Ok(());
    }
    Err(err) => {
      error!("active goal lookup failed: {err}");
      bot.reply_html(format!("❌ {}", err.user_message())).await?;
      return Ok(());
    }
  };

  let invoice = match app
    .cryptobot
    .create_donation_invoice(
      bot.user_id,
      Some(goal.id),
      &goal.title,
      amount_nano,
      &app.config.currency,
    )
    .await
  {
    Ok(invoice) => invoice,
    Err(err) => {
      error!("invoice for {} failed: {err}", bot.user_id);
      bot
        .reply_html("❌ The payment service is unavailable, try again later.")
        .await?;
      return Ok(());
    }
  };

  if let Err(err) = sv
    .donation
    .create(
      bot.user_id,
      Some(goal.id),
      amount_nano,
      &app.config.currency,
      &invoice.invoice_id.to_string(),
      DonationStatus::Pending,
    )
    .await
  {
    error!("donation for invoice {} not recorded: {err}", invoice.invoice_id);
    bot.reply_html(format!("❌ {}", err.user_message())).await?;
    return Ok(());
  }

  let text = format!(
    "💸 Donation of <b>{}</b> toward <b>{}</b>\n\n\
     The invoice is valid for one hour; the goal updates automatically \
     once you pay.",
    utils::format_amount(amount_nano, &app.config.currency),
    goal.title,
  );

  match Url::parse(&invoice.bot_invoice_url) {
    Ok(url) => {
      let keyboard = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::url("💳 Open invoice", url),
      ]]);
      bot.reply_with_keyboard(text, keyboard).await?;
    }
    Err(_) => {
      bot
        .reply_html(format!("{}\n\n{}", text, invoice.bot_invoice_url))
        .await?;
    }
  }

  Ok(())
}
