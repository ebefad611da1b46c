use crate::{entity::user, prelude::*};

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_id(&self, tg_user_id: i64) -> Result<Option<user::Model>> {
    let user = user::Entity::find_by_id(tg_user_id).one(self.db).await?;
    Ok(user)
  }

  /// Fails with `UserExists` when the Telegram id is already registered;
  /// callers that only want the row should use `get_or_create`.
  pub async fn create(
    &self,
    tg_user_id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
  ) -> Result<user::Model> {
    let now = Utc::now().naive_utc();
    user::ActiveModel {
      tg_user_id: Set(tg_user_id),
      username: Set(username.map(str::to_string)),
      first_name: Set(first_name.map(str::to_string)),
      last_name: Set(last_name.map(str::to_string)),
      created_at: Set(now),
    }
    .insert(self.db)
    .await
    .map_err(|e| Error::on_duplicate(e, Error::UserExists))
  }

  /// Registers the user lazily on first contact. Display names are refreshed
  /// when Telegram reports new ones; everything else stays immutable.
  pub async fn get_or_create(
    &self,
    tg_user_id: i64,
    username: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
  ) -> Result<user::Model> {
    if let Some(user) = self.by_id(tg_user_id).await? {
      if user.username.as_deref() != username
        || user.first_name.as_deref() != first_name
        || user.last_name.as_deref() != last_name
      {
        return Ok(
          user::ActiveModel {
            username: Set(username.map(str::to_string)),
            first_name: Set(first_name.map(str::to_string)),
            last_name: Set(last_name.map(str::to_string)),
            ..user.into()
          }
          .update(self.db)
          .await?,
        );
      }
      return Ok(user);
    }

    self.create(tg_user_id, username, first_name, last_name).await
  }

  pub async fn count(&self) -> Result<u64> {
    Ok(user::Entity::find().count(self.db).await?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::test_db;

  #[tokio::test]
  async fn get_or_create_registers_once() {
    let db = test_db::setup().await;
    let sv = User::new(&db);

    let user =
      sv.get_or_create(12345, Some("alice"), None, None).await.unwrap();
    assert_eq!(user.tg_user_id, 12345);
    assert_eq!(user.username.as_deref(), Some("alice"));

    sv.get_or_create(12345, Some("alice"), None, None).await.unwrap();
    assert_eq!(sv.count().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn create_rejects_duplicate_id() {
    let db = test_db::setup().await;
    let sv = User::new(&db);

    sv.create(12345, None, None, None).await.unwrap();
    let result = sv.create(12345, None, None, None).await;

    assert!(matches!(result, Err(Error::UserExists)));
  }

  #[tokio::test]
  async fn get_or_create_refreshes_display_names() {
    let db = test_db::setup().await;
    let sv = User::new(&db);

    sv.get_or_create(12345, Some("old_name"), Some("Alice"), None)
      .await
      .unwrap();
    let user = sv
      .get_or_create(12345, Some("new_name"), Some("Alice"), None)
      .await
      .unwrap();

    assert_eq!(user.username.as_deref(), Some("new_name"));
    assert_eq!(sv.count().await.unwrap(), 1);
  }
}
