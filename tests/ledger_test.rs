use std::sync::Arc;

use rust_decimal::Decimal;

use taskearn::catalog::{NewTask, TaskCatalog};
use taskearn::config::Settings;
use taskearn::error::LedgerError;
use taskearn::events::EventBus;
use taskearn::ledger::Ledger;
use taskearn::models::{AssignmentStatus, Proof, ReviewDecision, TransactionStatus};
use taskearn::store::Store;
use taskearn::users::{Profile, UserRegistry};
use taskearn::workflow::Workflow;

struct Env {
    users: UserRegistry,
    catalog: TaskCatalog,
    workflow: Workflow,
    ledger: Ledger,
}

fn env() -> Env {
    let store = Arc::new(Store::in_memory().unwrap());
    let events = EventBus::default();
    Env {
        users: UserRegistry::new(store.clone()),
        catalog: TaskCatalog::new(store.clone(), events.clone()),
        workflow: Workflow::new(store.clone(), Settings::default(), events.clone()),
        ledger: Ledger::new(store, events),
    }
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

#[test]
fn balance_matches_ledger_after_mixed_sequence() {
    let env = env();
    let user = env.users.register(10, Profile::default(), None).unwrap().user.id;

    env.ledger.credit(user, dec("12.50"), "reward").unwrap();
    env.ledger.debit(user, dec("3.25"), "fee").unwrap();
    env.ledger.credit(user, dec("0.10"), "bonus").unwrap();
    assert!(env.ledger.debit(user, dec("100"), "too much").is_err());
    let (pending, _) = env.ledger.reserve(user, dec("5.00"), "hold", "WDR").unwrap();
    env.ledger.fail(pending.id).unwrap();
    let (pending, _) = env.ledger.reserve(user, dec("4.00"), "hold", "WDR").unwrap();
    env.ledger.settle(pending.id).unwrap();

    let audit = env.ledger.audit(user).unwrap();
    assert!(audit.is_consistent());
    assert_eq!(audit.balance, dec("5.35"));
    assert_eq!(audit.completed_credits, dec("12.60"));
    assert_eq!(audit.completed_debits, dec("7.25"));
    assert_eq!(audit.pending_debits, Decimal::ZERO);
}

#[test]
fn overdraft_leaves_everything_unchanged() {
    let env = env();
    let user = env.users.register(11, Profile::default(), None).unwrap().user.id;
    env.ledger.credit(user, dec("4.00"), "reward").unwrap();

    let err = env.ledger.debit(user, dec("4.01"), "too much").unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    assert_eq!(env.ledger.balance(user).unwrap(), dec("4.00"));
    assert_eq!(env.ledger.transactions(user).unwrap().len(), 1);
}

#[test]
fn pending_reservation_counts_against_balance() {
    let env = env();
    let user = env.users.register(12, Profile::default(), None).unwrap().user.id;
    env.ledger.credit(user, dec("10"), "reward").unwrap();
    let (pending, balance) = env.ledger.reserve(user, dec("8"), "hold", "WDR").unwrap();

    assert_eq!(pending.status, TransactionStatus::Pending);
    assert_eq!(balance, dec("2"));
    assert!(env.ledger.debit(user, dec("3"), "second").is_err());
    assert!(env.ledger.audit(user).unwrap().is_consistent());
}

#[test]
fn survey_task_lifecycle() {
    let env = env();
    let task = env
        .catalog
        .create_task(NewTask::new("Survey", "Fill form", dec("2.50"), "survey"))
        .unwrap();

    let active = env.catalog.list_active_tasks().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, task.id);
    assert_eq!(active[0].reward, dec("2.50"));

    env.catalog.deactivate_task(task.id).unwrap();
    assert!(env.catalog.list_active_tasks().unwrap().is_empty());
}

#[test]
fn submission_starts_pending_and_survives_deactivation() {
    let env = env();
    let user = env.users.register(13, Profile::default(), None).unwrap().user.id;
    let task = env
        .catalog
        .create_task(NewTask::new("Survey", "Fill form", dec("2.50"), "survey"))
        .unwrap();

    let assignment = env
        .workflow
        .submit_proof(user, task.id, Proof::text("done, see attached"))
        .unwrap();
    assert_eq!(assignment.status, AssignmentStatus::Pending);
    assert_eq!(assignment.proof, Proof::text("done, see attached"));

    env.catalog.deactivate_task(task.id).unwrap();
    let again = env.workflow.assignment(assignment.id).unwrap();
    assert_eq!(again, assignment);
    assert_eq!(env.workflow.assignments_for_task(task.id).unwrap().len(), 1);
}

#[test]
fn approval_credits_reward_once() {
    let env = env();
    let user = env.users.register(14, Profile::default(), None).unwrap().user.id;
    let task = env
        .catalog
        .create_task(NewTask::new("Follow", "Follow the page", dec("1.75"), "social"))
        .unwrap();
    let assignment = env
        .workflow
        .submit_proof(user, task.id, Proof::media("AgADBA", Some("screenshot".into())))
        .unwrap();

    let review = env
        .workflow
        .review_assignment(assignment.id, ReviewDecision::Approve, None)
        .unwrap();
    assert_eq!(review.assignment.status, AssignmentStatus::Completed);
    assert!(review.assignment.completed_at.is_some());
    assert_eq!(review.credit.unwrap().amount, dec("1.75"));

    assert!(
        env.workflow
            .review_assignment(assignment.id, ReviewDecision::Approve, None)
            .is_err()
    );
    assert_eq!(env.ledger.balance(user).unwrap(), dec("1.75"));
    assert!(env.ledger.audit(user).unwrap().is_consistent());
}

#[test]
fn ledger_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskearn.db");
    let path = path.to_str().unwrap();

    let user = {
        let store = Arc::new(Store::open(path).unwrap());
        let user = UserRegistry::new(store.clone())
            .register(15, Profile::default(), None)
            .unwrap()
            .user
            .id;
        Ledger::new(store, EventBus::default())
            .credit(user, dec("9.99"), "reward")
            .unwrap();
        user
    };

    let store = Arc::new(Store::open(path).unwrap());
    let ledger = Ledger::new(store, EventBus::default());
    assert_eq!(ledger.balance(user).unwrap(), dec("9.99"));
    assert_eq!(ledger.transactions(user).unwrap().len(), 1);
}
