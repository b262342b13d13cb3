//! Task catalog: admins create tasks, users browse the active ones.
//!
//! Tasks are never deleted. Deactivation hides a task from the listing but
//! leaves existing assignments pointing at it untouched.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::events::{Event, EventBus};
use crate::models::Task;
use crate::store::Store;

/// Input for [`TaskCatalog::create_task`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub reward: Decimal,
    pub task_type: String,
    pub requirements: Option<String>,
}

impl NewTask {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        reward: Decimal,
        task_type: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            reward,
            task_type: task_type.into(),
            requirements: None,
        }
    }

    /// Parse the admin payload `title|description|reward|type`.
    pub fn parse_admin_payload(payload: &str) -> LedgerResult<Self> {
        let fields: Vec<&str> = payload.split('|').map(str::trim).collect();
        let [title, description, reward, task_type] = fields.as_slice() else {
            return Err(LedgerError::validation(
                "expected title|description|reward|type",
            ));
        };
        let reward = Decimal::from_str(reward)
            .map_err(|e| LedgerError::validation(format!("invalid reward {reward:?}: {e}")))?;
        Ok(Self::new(*title, *description, reward, *task_type))
    }

    fn validate(&self) -> LedgerResult<()> {
        if self.title.trim().is_empty() {
            return Err(LedgerError::validation("title must not be empty"));
        }
        if self.reward <= Decimal::ZERO {
            return Err(LedgerError::validation(format!(
                "reward must be positive, got {}",
                self.reward
            )));
        }
        Ok(())
    }
}

pub struct TaskCatalog {
    store: Arc<Store>,
    events: EventBus,
}

impl TaskCatalog {
    pub fn new(store: Arc<Store>, events: EventBus) -> Self {
        Self { store, events }
    }

    pub fn create_task(&self, new: NewTask) -> LedgerResult<Task> {
        new.validate()?;
        let task = self.store.atomic(|tx| {
            tx.execute(
                "INSERT INTO tasks (title, description, reward, task_type, requirements,
                                    is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
                params![
                    new.title.trim(),
                    new.description.trim(),
                    new.reward.normalize().to_string(),
                    new.task_type.trim(),
                    new.requirements,
                    Utc::now(),
                ],
            )?;
            let id = tx.last_insert_rowid();
            query_task(tx, id)?.ok_or_else(|| LedgerError::not_found("task", id))
        })?;

        info!(task_id = task.id, title = %task.title, reward = %task.reward, "task created");
        self.events.emit(Event::TaskCreated {
            task_id: task.id,
            title: task.title.clone(),
        });
        Ok(task)
    }

    /// Active tasks in creation order.
    pub fn list_active_tasks(&self) -> LedgerResult<Vec<Task>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tasks WHERE is_active = 1 ORDER BY id ASC",
                Task::COLUMNS
            ))?;
            let tasks = stmt
                .query_map([], Task::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            debug!(count = tasks.len(), "listed active tasks");
            Ok(tasks)
        })
    }

    pub fn get_task(&self, task_id: i64) -> LedgerResult<Task> {
        self.store.with_conn(|conn| {
            query_task(conn, task_id)?.ok_or_else(|| LedgerError::not_found("task", task_id))
        })
    }

    /// Hide a task from the listing. Deactivating twice is a no-op.
    pub fn deactivate_task(&self, task_id: i64) -> LedgerResult<Task> {
        let (task, changed) = self.store.atomic(|tx| {
            let changed = tx.execute(
                "UPDATE tasks SET is_active = 0 WHERE id = ?1 AND is_active = 1",
                [task_id],
            )? > 0;
            let task =
                query_task(tx, task_id)?.ok_or_else(|| LedgerError::not_found("task", task_id))?;
            Ok::<_, LedgerError>((task, changed))
        })?;

        if changed {
            info!(task_id, "task deactivated");
            self.events.emit(Event::TaskDeactivated { task_id });
        }
        Ok(task)
    }
}

pub(crate) fn query_task(conn: &Connection, id: i64) -> LedgerResult<Option<Task>> {
    let task = conn
        .query_row(
            &format!("SELECT {} FROM tasks WHERE id = ?1", Task::COLUMNS),
            [id],
            Task::from_row,
        )
        .optional()?;
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TaskCatalog {
        TaskCatalog::new(Arc::new(Store::in_memory().unwrap()), EventBus::default())
    }

    fn survey() -> NewTask {
        NewTask::new("Survey", "Fill form", Decimal::new(250, 2), "survey")
    }

    #[test]
    fn create_then_list_then_deactivate() {
        let catalog = catalog();
        let task = catalog.create_task(survey()).unwrap();
        assert!(task.is_active);
        assert_eq!(task.reward, Decimal::new(250, 2));

        let active = catalog.list_active_tasks().unwrap();
        assert_eq!(active, vec![task.clone()]);

        catalog.deactivate_task(task.id).unwrap();
        assert!(catalog.list_active_tasks().unwrap().is_empty());
    }

    #[test]
    fn list_preserves_creation_order() {
        let catalog = catalog();
        for title in ["first", "second", "third"] {
            catalog
                .create_task(NewTask::new(title, "", Decimal::ONE, "misc"))
                .unwrap();
        }
        let titles: Vec<String> = catalog
            .list_active_tasks()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn non_positive_reward_is_rejected() {
        let catalog = catalog();
        for reward in [Decimal::ZERO, Decimal::new(-1, 0)] {
            let mut task = survey();
            task.reward = reward;
            assert!(matches!(
                catalog.create_task(task),
                Err(LedgerError::Validation(_))
            ));
        }
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut task = survey();
        task.title = "  ".into();
        assert!(matches!(
            catalog().create_task(task),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn deactivate_is_idempotent() {
        let catalog = catalog();
        let task = catalog.create_task(survey()).unwrap();
        let once = catalog.deactivate_task(task.id).unwrap();
        let twice = catalog.deactivate_task(task.id).unwrap();
        assert!(!once.is_active);
        assert_eq!(once, twice);
    }

    #[test]
    fn deactivate_missing_task_is_not_found() {
        assert!(matches!(
            catalog().deactivate_task(404),
            Err(LedgerError::NotFound { entity: "task", .. })
        ));
    }

    #[tokio::test]
    async fn create_emits_event() {
        let catalog = catalog();
        let mut rx = catalog.events.subscribe();
        let task = catalog.create_task(survey()).unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            Event::TaskCreated {
                task_id: task.id,
                title: "Survey".into()
            }
        );
    }

    #[test]
    fn parse_admin_payload_reads_four_fields() {
        let task = NewTask::parse_admin_payload("Survey | Fill form | 2.50 | survey").unwrap();
        assert_eq!(task, survey());
    }

    #[test]
    fn parse_admin_payload_rejects_wrong_shape() {
        assert!(NewTask::parse_admin_payload("Survey|Fill form|2.50").is_err());
        assert!(NewTask::parse_admin_payload("Survey|Fill form|lots|survey").is_err());
    }
}
