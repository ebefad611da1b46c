use crate::{prelude::*, sv::cryptobot::NANO_USDT};

pub fn format_date(date: DateTime) -> String {
  date.format("%d.%m.%Y %H:%M").to_string()
}

pub fn format_amount(amount_nano: i64, currency: &str) -> String {
  format!("{:.2} {}", amount_nano as f64 / NANO_USDT as f64, currency)
}

/// Ten-segment progress bar for the goal view. Percent is left unclamped:
/// overfunded goals read as 120% with a full bar.
pub fn progress_bar(current: i64, target: i64) -> String {
  let percent = if target > 0 {
    (current as f64 / target as f64 * 100.0).round() as i64
  } else {
    0
  };
  let filled = (percent / 10).clamp(0, 10) as usize;

  format!("{}{} {}%", "▰".repeat(filled), "▱".repeat(10 - filled), percent)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn formats_amounts_with_currency() {
    assert_eq!(format_amount(10 * NANO_USDT, "USDT"), "10.00 USDT");
    assert_eq!(format_amount(NANO_USDT / 4, "TON"), "0.25 TON");
  }

  #[test]
  fn progress_bar_tracks_percent() {
    assert_eq!(progress_bar(0, 1000), "▱▱▱▱▱▱▱▱▱▱ 0%");
    assert_eq!(progress_bar(550, 1000), "▰▰▰▰▰▱▱▱▱▱ 55%");
    assert_eq!(progress_bar(1000, 1000), "▰▰▰▰▰▰▰▰▰▰ 100%");
  }

  #[test]
  fn progress_bar_shows_overfunding_unclamped() {
    assert_eq!(progress_bar(1300, 1000), "▰▰▰▰▰▰▰▰▰▰ 130%");
  }
}
