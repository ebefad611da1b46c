use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Db(#[from] DbErr),

  #[error("user is already registered")]
  UserExists,

  #[error("no active donation goal")]
  NoActiveGoal,

  #[error("unknown payment `{0}`")]
  UnknownPayment(String),
  #[error("payment `{0}` is already recorded")]
  DuplicatePayment(String),
  #[error("donation is already marked failed")]
  AlreadyFailed,
  #[error("donation is already confirmed")]
  AlreadyConfirmed,

  #[error("invalid arguments: {0}")]
  InvalidArgs(String),

  #[error("cryptobot error: {0}")]
  CryptoBot(String),
}

impl Error {
  /// Maps a unique-constraint violation from an insert to `dup`; every other
  /// database error passes through unchanged.
  pub fn on_duplicate(err: DbErr, dup: Error) -> Error {
    match err.sql_err() {
      Some(SqlErr::UniqueConstraintViolation(_)) => dup,
      _ => Error::Db(err),
    }
  }

  /// Short user-facing description, safe to send back to the chat.
  pub fn user_message(&self) -> String {
    match self {
      Error::UserExists => "You are already registered".into(),
      Error::NoActiveGoal => {
        "There is no active fundraising goal right now".into()
      }
      Error::UnknownPayment(_) => "This payment is not known to us".into(),
      Error::DuplicatePayment(_) => {
        "This payment has already been counted".into()
      }
      Error::AlreadyFailed | Error::AlreadyConfirmed => {
        "This payment has already been settled".into()
      }
      Error::InvalidArgs(msg) => msg.clone(),
      Error::Db(_) | Error::CryptoBot(_) => {
        "Something went wrong, please try again later".into()
      }
    }
  }
}
