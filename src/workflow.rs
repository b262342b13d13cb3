//! Submission workflow: pick a task, submit proof, get reviewed.
//!
//! A submission starts `pending`. Review moves it to `completed` or
//! `rejected` exactly once. Approval credits the task reward to the
//! submitter in the same atomic unit as the status change, so an approved
//! assignment without its credit (or the reverse) cannot be observed.
//!
//! Resubmitting the same task is allowed; only the per-user cap on pending
//! submissions limits it.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::catalog::query_task;
use crate::config::Settings;
use crate::error::{LedgerError, LedgerResult};
use crate::events::{Event, EventBus};
use crate::ledger::apply_credit;
use crate::models::{Assignment, AssignmentStatus, Proof, ReviewDecision, Task, Transaction, User};
use crate::store::Store;
use crate::users::query_by_id;

/// Outcome of [`Workflow::review_assignment`].
#[derive(Debug, Clone)]
pub struct Review {
    pub assignment: Assignment,
    /// The reward credit, present only for approvals.
    pub credit: Option<Transaction>,
}

pub struct Workflow {
    store: Arc<Store>,
    settings: Settings,
    events: EventBus,
}

impl Workflow {
    pub fn new(store: Arc<Store>, settings: Settings, events: EventBus) -> Self {
        Self {
            store,
            settings,
            events,
        }
    }

    /// Check that `user_id` may work on `task_id` right now.
    pub fn select_task(&self, user_id: i64, task_id: i64) -> LedgerResult<Task> {
        self.store.with_conn(|conn| {
            require_user(conn, user_id)?;
            let task = require_active_task(conn, task_id)?;
            debug!(user_id, task_id, "task selected");
            Ok(task)
        })
    }

    /// Record proof of completion as a new pending assignment.
    pub fn submit_proof(&self, user_id: i64, task_id: i64, proof: Proof) -> LedgerResult<Assignment> {
        if proof.is_empty() {
            return Err(LedgerError::validation("proof must not be empty"));
        }
        let proof_json = serde_json::to_string(&proof)
            .map_err(|e| LedgerError::validation(format!("unserializable proof: {e}")))?;
        let cap = self.settings.max_pending_per_user;

        let assignment = self.store.atomic(|tx| {
            require_user(tx, user_id)?;
            require_active_task(tx, task_id)?;

            if cap > 0 {
                let pending: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM user_tasks WHERE user_id = ?1 AND status = ?2",
                    params![user_id, AssignmentStatus::Pending],
                    |row| row.get(0),
                )?;
                if pending as usize >= cap {
                    return Err(LedgerError::validation(format!(
                        "{pending} submissions already awaiting review (limit {cap})"
                    )));
                }
            }

            tx.execute(
                "INSERT INTO user_tasks (user_id, task_id, status, submitted_at, proof)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user_id,
                    task_id,
                    AssignmentStatus::Pending,
                    Utc::now(),
                    proof_json
                ],
            )?;
            let id = tx.last_insert_rowid();
            query_assignment(tx, id)?.ok_or_else(|| LedgerError::not_found("assignment", id))
        })?;

        info!(assignment_id = assignment.id, user_id, task_id, "proof submitted");
        self.events.emit(Event::ProofSubmitted {
            assignment_id: assignment.id,
            user_id,
            task_id,
        });
        Ok(assignment)
    }

    /// Approve or reject a pending assignment. Approval credits the task's
    /// reward to the assignee.
    pub fn review_assignment(
        &self,
        assignment_id: i64,
        decision: ReviewDecision,
        note: Option<&str>,
    ) -> LedgerResult<Review> {
        let (assignment, credit) = self.store.atomic(|tx| {
            let current = query_assignment(tx, assignment_id)?
                .ok_or_else(|| LedgerError::not_found("assignment", assignment_id))?;
            if current.status != AssignmentStatus::Pending {
                return Err(LedgerError::validation(format!(
                    "assignment {assignment_id} was already reviewed ({})",
                    current.status
                )));
            }

            let now = Utc::now();
            let status = decision.status();
            let completed_at = (status == AssignmentStatus::Completed).then_some(now);
            tx.execute(
                "UPDATE user_tasks
                 SET status = ?1, completed_at = ?2, reviewed_at = ?3, review_note = ?4
                 WHERE id = ?5",
                params![status, completed_at, now, note, assignment_id],
            )?;

            let credit = match decision {
                ReviewDecision::Approve => {
                    let task = query_task(tx, current.task_id)?
                        .ok_or_else(|| LedgerError::not_found("task", current.task_id))?;
                    let reason = format!("Reward for task #{}: {}", task.id, task.title);
                    Some(apply_credit(tx, current.user_id, task.reward, &reason)?)
                }
                ReviewDecision::Reject => None,
            };

            let assignment = query_assignment(tx, assignment_id)?
                .ok_or_else(|| LedgerError::not_found("assignment", assignment_id))?;
            Ok((assignment, credit))
        })?;

        info!(
            assignment_id,
            user_id = assignment.user_id,
            status = %assignment.status,
            "assignment reviewed"
        );
        self.events.emit(Event::AssignmentReviewed {
            assignment_id,
            user_id: assignment.user_id,
            status: assignment.status,
        });
        let credit = credit.map(|(credit, balance)| {
            self.events.emit(Event::BalanceCredited {
                user_id: credit.user_id,
                amount: credit.amount,
                balance,
            });
            credit
        });
        Ok(Review { assignment, credit })
    }

    pub fn assignment(&self, assignment_id: i64) -> LedgerResult<Assignment> {
        self.store.with_conn(|conn| {
            query_assignment(conn, assignment_id)?
                .ok_or_else(|| LedgerError::not_found("assignment", assignment_id))
        })
    }

    /// A user's submissions, newest first.
    pub fn assignments_for_user(&self, user_id: i64) -> LedgerResult<Vec<Assignment>> {
        self.list("WHERE user_id = ?1 ORDER BY id DESC", params![user_id])
    }

    pub fn assignments_for_task(&self, task_id: i64) -> LedgerResult<Vec<Assignment>> {
        self.list("WHERE task_id = ?1 ORDER BY id ASC", params![task_id])
    }

    /// The review queue, oldest first.
    pub fn pending_assignments(&self) -> LedgerResult<Vec<Assignment>> {
        self.list(
            "WHERE status = ?1 ORDER BY id ASC",
            params![AssignmentStatus::Pending],
        )
    }

    fn list(&self, clause: &str, args: &[&dyn rusqlite::ToSql]) -> LedgerResult<Vec<Assignment>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM user_tasks {clause}",
                Assignment::COLUMNS
            ))?;
            let rows = stmt
                .query_map(args, Assignment::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn require_user(conn: &Connection, user_id: i64) -> LedgerResult<User> {
    query_by_id(conn, user_id)?.ok_or_else(|| LedgerError::not_found("user", user_id))
}

/// Inactive tasks are reported the same as missing ones: not available.
fn require_active_task(conn: &Connection, task_id: i64) -> LedgerResult<Task> {
    query_task(conn, task_id)?
        .filter(|task| task.is_active)
        .ok_or_else(|| LedgerError::not_found("task", task_id))
}

fn query_assignment(conn: &Connection, id: i64) -> LedgerResult<Option<Assignment>> {
    let assignment = conn
        .query_row(
            &format!("SELECT {} FROM user_tasks WHERE id = ?1", Assignment::COLUMNS),
            [id],
            Assignment::from_row,
        )
        .optional()?;
    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewTask, TaskCatalog};
    use crate::ledger::Ledger;
    use crate::users::{Profile, UserRegistry};
    use rust_decimal::Decimal;

    struct Fixture {
        workflow: Workflow,
        catalog: TaskCatalog,
        ledger: Ledger,
        user: i64,
        task: i64,
    }

    fn fixture_with(settings: Settings) -> Fixture {
        let store = Arc::new(Store::in_memory().unwrap());
        let events = EventBus::default();
        let user = UserRegistry::new(store.clone())
            .register(1, Profile::default(), None)
            .unwrap()
            .user
            .id;
        let catalog = TaskCatalog::new(store.clone(), events.clone());
        let task = catalog
            .create_task(NewTask::new("Survey", "Fill form", Decimal::new(250, 2), "survey"))
            .unwrap()
            .id;
        Fixture {
            workflow: Workflow::new(store.clone(), settings, events.clone()),
            catalog,
            ledger: Ledger::new(store, events),
            user,
            task,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Settings::default())
    }

    #[test]
    fn submit_creates_pending_assignment() {
        let f = fixture();
        let a = f
            .workflow
            .submit_proof(f.user, f.task, Proof::text("done, see attached"))
            .unwrap();
        assert_eq!(a.status, AssignmentStatus::Pending);
        assert!(a.completed_at.is_none());
        assert!(a.submitted_at <= Utc::now());
        assert_eq!(a.proof, Proof::text("done, see attached"));
    }

    #[test]
    fn empty_proof_is_rejected() {
        let f = fixture();
        assert!(matches!(
            f.workflow.submit_proof(f.user, f.task, Proof::text("")),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn media_proof_is_stored() {
        let f = fixture();
        let proof = Proof::media("AgADBAAD", None);
        let a = f.workflow.submit_proof(f.user, f.task, proof.clone()).unwrap();
        assert_eq!(f.workflow.assignment(a.id).unwrap().proof, proof);
    }

    #[test]
    fn select_inactive_task_is_not_found() {
        let f = fixture();
        f.catalog.deactivate_task(f.task).unwrap();
        assert!(matches!(
            f.workflow.select_task(f.user, f.task),
            Err(LedgerError::NotFound { entity: "task", .. })
        ));
    }

    #[test]
    fn select_missing_task_is_not_found() {
        let f = fixture();
        assert!(f.workflow.select_task(f.user, 404).is_err());
        assert_eq!(f.workflow.select_task(f.user, f.task).unwrap().id, f.task);
    }

    #[test]
    fn duplicate_submissions_are_allowed() {
        let f = fixture();
        f.workflow.submit_proof(f.user, f.task, Proof::text("one")).unwrap();
        f.workflow.submit_proof(f.user, f.task, Proof::text("two")).unwrap();
        assert_eq!(f.workflow.assignments_for_user(f.user).unwrap().len(), 2);
    }

    #[test]
    fn pending_cap_is_enforced() {
        let f = fixture_with(Settings {
            max_pending_per_user: 1,
            ..Settings::default()
        });
        f.workflow.submit_proof(f.user, f.task, Proof::text("one")).unwrap();
        assert!(matches!(
            f.workflow.submit_proof(f.user, f.task, Proof::text("two")),
            Err(LedgerError::Validation(_))
        ));
    }

    #[test]
    fn approval_credits_reward() {
        let f = fixture();
        let a = f.workflow.submit_proof(f.user, f.task, Proof::text("done")).unwrap();
        let review = f
            .workflow
            .review_assignment(a.id, ReviewDecision::Approve, None)
            .unwrap();
        assert_eq!(review.assignment.status, AssignmentStatus::Completed);
        assert!(review.assignment.completed_at.is_some());
        assert_eq!(review.credit.unwrap().amount, Decimal::new(250, 2));
        assert_eq!(f.ledger.balance(f.user).unwrap(), Decimal::new(250, 2));
        assert!(f.ledger.audit(f.user).unwrap().is_consistent());
    }

    #[test]
    fn approval_that_would_overflow_balance_rolls_back() {
        let f = fixture();
        let huge = f
            .catalog
            .create_task(NewTask::new("Jackpot", "", Decimal::MAX, "bonus"))
            .unwrap()
            .id;
        let first = f.workflow.submit_proof(f.user, huge, Proof::text("a")).unwrap();
        let second = f.workflow.submit_proof(f.user, huge, Proof::text("b")).unwrap();
        f.workflow
            .review_assignment(first.id, ReviewDecision::Approve, None)
            .unwrap();

        assert!(matches!(
            f.workflow
                .review_assignment(second.id, ReviewDecision::Approve, None),
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(
            f.workflow.assignment(second.id).unwrap().status,
            AssignmentStatus::Pending
        );
        assert_eq!(f.ledger.balance(f.user).unwrap(), Decimal::MAX);
        assert_eq!(f.catalog.list_active_tasks().unwrap().len(), 2);
    }

    #[test]
    fn rejection_leaves_balance_alone() {
        let f = fixture();
        let a = f.workflow.submit_proof(f.user, f.task, Proof::text("meh")).unwrap();
        let review = f
            .workflow
            .review_assignment(a.id, ReviewDecision::Reject, Some("blurry photo"))
            .unwrap();
        assert_eq!(review.assignment.status, AssignmentStatus::Rejected);
        assert_eq!(review.assignment.review_note.as_deref(), Some("blurry photo"));
        assert!(review.assignment.completed_at.is_none());
        assert!(review.credit.is_none());
        assert_eq!(f.ledger.balance(f.user).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn review_happens_once() {
        let f = fixture();
        let a = f.workflow.submit_proof(f.user, f.task, Proof::text("done")).unwrap();
        f.workflow.review_assignment(a.id, ReviewDecision::Approve, None).unwrap();
        assert!(matches!(
            f.workflow.review_assignment(a.id, ReviewDecision::Approve, None),
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(f.ledger.balance(f.user).unwrap(), Decimal::new(250, 2));
    }

    #[test]
    fn review_missing_assignment_is_not_found() {
        let f = fixture();
        assert!(matches!(
            f.workflow.review_assignment(77, ReviewDecision::Reject, None),
            Err(LedgerError::NotFound { entity: "assignment", .. })
        ));
    }

    #[test]
    fn deactivation_keeps_existing_assignments() {
        let f = fixture();
        let a = f.workflow.submit_proof(f.user, f.task, Proof::text("done")).unwrap();
        f.catalog.deactivate_task(f.task).unwrap();
        assert_eq!(f.workflow.assignment(a.id).unwrap(), a);
        assert_eq!(f.workflow.assignments_for_task(f.task).unwrap(), vec![a]);
    }

    #[test]
    fn approval_after_deactivation_still_credits() {
        let f = fixture();
        let a = f.workflow.submit_proof(f.user, f.task, Proof::text("done")).unwrap();
        f.catalog.deactivate_task(f.task).unwrap();
        f.workflow.review_assignment(a.id, ReviewDecision::Approve, None).unwrap();
        assert_eq!(f.ledger.balance(f.user).unwrap(), Decimal::new(250, 2));
    }

    #[test]
    fn pending_queue_shrinks_after_review() {
        let f = fixture();
        let a = f.workflow.submit_proof(f.user, f.task, Proof::text("1")).unwrap();
        f.workflow.submit_proof(f.user, f.task, Proof::text("2")).unwrap();
        assert_eq!(f.workflow.pending_assignments().unwrap().len(), 2);
        f.workflow.review_assignment(a.id, ReviewDecision::Reject, None).unwrap();
        assert_eq!(f.workflow.pending_assignments().unwrap().len(), 1);
    }
}
