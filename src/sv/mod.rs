pub mod cryptobot;
pub mod donation;
pub mod goal;
#[cfg(test)]
pub mod test_utils;
pub mod user;

pub use donation::Donation;
pub use goal::Goal;
pub use user::User;
