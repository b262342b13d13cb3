//! Wires the marketplace components around one store, one set of settings,
//! and one event bus. The front-end only talks to [`Market`].

use std::sync::Arc;

use crate::catalog::TaskCatalog;
use crate::config::Settings;
use crate::events::EventBus;
use crate::ledger::Ledger;
use crate::settlement::Settlement;
use crate::store::Store;
use crate::users::UserRegistry;
use crate::withdrawal::WithdrawalProcessor;
use crate::workflow::Workflow;

pub struct Market {
    pub users: UserRegistry,
    pub catalog: TaskCatalog,
    pub workflow: Workflow,
    pub ledger: Arc<Ledger>,
    pub withdrawals: WithdrawalProcessor,
    pub settings: Settings,
    pub events: EventBus,
}

impl Market {
    pub fn new(store: Arc<Store>, settings: Settings, settlement: Arc<dyn Settlement>) -> Self {
        let events = EventBus::default();
        let ledger = Arc::new(Ledger::new(store.clone(), events.clone()));
        Self {
            users: UserRegistry::new(store.clone()),
            catalog: TaskCatalog::new(store.clone(), events.clone()),
            workflow: Workflow::new(store, settings.clone(), events.clone()),
            withdrawals: WithdrawalProcessor::new(
                ledger.clone(),
                settlement,
                settings.clone(),
                events.clone(),
            ),
            ledger,
            settings,
            events,
        }
    }

    /// An ephemeral market with simulated settlement.
    pub fn in_memory(settings: Settings) -> anyhow::Result<Self> {
        let store = Arc::new(Store::in_memory()?);
        Ok(Self::new(
            store,
            settings,
            Arc::new(crate::settlement::simulated::AlwaysSucceeds),
        ))
    }
}
