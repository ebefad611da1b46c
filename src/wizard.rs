use crate::prelude::*;

/// Goal-creation steps in the order the admin walks them. `Done` means every
/// field has been collected and the draft is ready to be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
  Title,
  Description,
  Amount,
  Done,
}

#[derive(Debug, Clone)]
pub struct Draft {
  pub chat_id: i64,
  pub step: Step,
  pub title: Option<String>,
  pub description: Option<String>,
  pub amount: Option<i64>,
  pub updated_at: DateTime,
}

/// Per-admin goal-creation drafts, keyed by the admin's Telegram id.
///
/// Lives in process memory only: a restart drops open wizards and nothing
/// durable depends on them. Mutations on the same key are serialized by the
/// map's entry locks; different admins never block each other.
pub struct Wizard {
  drafts: DashMap<i64, Draft>,
}

impl Wizard {
  pub fn new() -> Self {
    Self { drafts: DashMap::new() }
  }

  /// Opens a fresh draft, overwriting any wizard the admin left half-done.
  pub fn start(&self, admin_id: i64, chat_id: i64) {
    self.drafts.insert(admin_id, Draft {
      chat_id,
      step: Step::Title,
      title: None,
      description: None,
      amount: None,
      updated_at: Utc::now().naive_utc(),
    });
  }

  pub fn get(&self, admin_id: i64) -> Option<Draft> {
    self.drafts.get(&admin_id).map(|draft| draft.clone())
  }

  /// Stores the title and advances to the description step. Returns the new
  /// step, or `None` when the admin has no open draft (a caller bug: the
  /// conversation flow is caller-driven).
  pub fn set_title(&self, admin_id: i64, title: String) -> Option<Step> {
    self.update(admin_id, "title", |draft| {
      draft.title = Some(title);
      draft.step = Step::Description;
    })
  }

  pub fn set_description(
    &self,
    admin_id: i64,
    description: String,
  ) -> Option<Step> {
    self.update(admin_id, "description", |draft| {
      draft.description = Some(description);
      draft.step = Step::Amount;
    })
  }

  /// Stores the target amount and completes the wizard. The store does not
  /// validate the value; `sv::Goal::create` rejects non-positive targets at
  /// commit time.
  pub fn set_amount(&self, admin_id: i64, amount: i64) -> Option<Step> {
    self.update(admin_id, "amount", |draft| {
      draft.amount = Some(amount);
      draft.step = Step::Done;
    })
  }

  /// Drops the draft if present. Idempotent.
  pub fn cancel(&self, admin_id: i64) {
    self.drafts.remove(&admin_id);
  }

  pub fn is_creating(&self, admin_id: i64) -> bool {
    self
      .drafts
      .get(&admin_id)
      .is_some_and(|draft| draft.step != Step::Done)
  }

  /// Removes drafts idle for longer than `ttl`. Returns how many were
  /// dropped. Open wizards have no deadline of their own; this runs from the
  /// cron plugin purely as a memory bound.
  pub fn gc(&self, ttl: TimeDelta) -> usize {
    let deadline = Utc::now().naive_utc() - ttl;
    let before = self.drafts.len();
    self.drafts.retain(|_, draft| draft.updated_at > deadline);
    before.saturating_sub(self.drafts.len())
  }

  fn update(
    &self,
    admin_id: i64,
    field: &'static str,
    apply: impl FnOnce(&mut Draft),
  ) -> Option<Step> {
    match self.drafts.get_mut(&admin_id) {
      Some(mut draft) => {
        apply(&mut draft);
        draft.updated_at = Utc::now().naive_utc();
        Some(draft.step)
      }
      None => {
        warn!("wizard: set {field} for {admin_id} without an open draft");
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn walks_all_steps_in_order() {
    let wizard = Wizard::new();
    wizard.start(1, 100);
    assert!(wizard.is_creating(1));

    assert_eq!(
      wizard.set_title(1, "Roof Repair".into()),
      Some(Step::Description)
    );
    assert_eq!(
      wizard.set_description(1, "Fix the roof".into()),
      Some(Step::Amount)
    );
    assert_eq!(wizard.set_amount(1, 1000), Some(Step::Done));

    let draft = wizard.get(1).unwrap();
    assert_eq!(draft.step, Step::Done);
    assert_eq!(draft.chat_id, 100);
    assert_eq!(draft.title.as_deref(), Some("Roof Repair"));
    assert_eq!(draft.description.as_deref(), Some("Fix the roof"));
    assert_eq!(draft.amount, Some(1000));

    // the wizard is complete, the admin is no longer mid-conversation
    assert!(!wizard.is_creating(1));
  }

  #[test]
  fn set_without_draft_is_a_noop() {
    let wizard = Wizard::new();
    assert_eq!(wizard.set_title(1, "ignored".into()), None);
    assert!(wizard.get(1).is_none());
    assert!(!wizard.is_creating(1));
  }

  #[test]
  fn start_overwrites_previous_draft() {
    let wizard = Wizard::new();
    wizard.start(1, 100);
    wizard.set_title(1, "Old".into());

    wizard.start(1, 200);
    let draft = wizard.get(1).unwrap();
    assert_eq!(draft.step, Step::Title);
    assert_eq!(draft.chat_id, 200);
    assert!(draft.title.is_none());
  }

  #[test]
  fn cancel_is_idempotent() {
    let wizard = Wizard::new();
    wizard.start(1, 100);
    wizard.cancel(1);
    wizard.cancel(1);
    assert!(wizard.get(1).is_none());
  }

  #[test]
  fn admins_do_not_share_drafts() {
    let wizard = Wizard::new();
    wizard.start(1, 100);
    wizard.start(2, 200);
    wizard.set_title(1, "First".into());

    assert_eq!(wizard.get(2).unwrap().step, Step::Title);
    assert_eq!(wizard.get(1).unwrap().step, Step::Description);
  }

  #[test]
  fn gc_drops_only_stale_drafts() {
    let wizard = Wizard::new();
    wizard.start(1, 100);
    assert_eq!(wizard.gc(TimeDelta::hours(1)), 0);
    assert!(wizard.get(1).is_some());

    assert_eq!(wizard.gc(TimeDelta::seconds(-1)), 1);
    assert!(wizard.get(1).is_none());
  }
}
