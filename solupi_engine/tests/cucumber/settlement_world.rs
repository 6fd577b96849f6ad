use std::{collections::HashMap, fmt::Debug};

use cucumber::World;
use log::*;
use solupi_engine::{
    events::EventProducers,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    IngestionApi,
    OrderFlowApi,
    ReconciliationApi,
    SettlementApi,
    SettlementConfig,
    SqliteDatabase,
};
use tokio::time::sleep;

use crate::support::CountingPayout;

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<SettlementSystem>,
}

pub struct SettlementSystem {
    pub db_path: String,
    pub payout: CountingPayout,
    pub orders: OrderFlowApi<SqliteDatabase, CountingPayout>,
    pub ingestion: IngestionApi<SqliteDatabase, CountingPayout>,
    pub reconciliation: ReconciliationApi<SqliteDatabase, CountingPayout>,
    /// Order ids, keyed by the label used in the scenario
    pub labels: HashMap<String, i64>,
}

impl Debug for SettlementSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementSystem ({})", self.db_path)
    }
}

impl SettlementWorld {
    pub fn system(&self) -> &SettlementSystem {
        self.system.as_ref().expect("SettlementSystem not initialised")
    }

    pub fn system_mut(&mut self) -> &mut SettlementSystem {
        self.system.as_mut().expect("SettlementSystem not initialised")
    }

    pub fn order_id(&self, label: &str) -> i64 {
        *self.system().labels.get(label).unwrap_or_else(|| panic!("No order labelled {label}"))
    }
}

impl SettlementSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        sleep(std::time::Duration::from_millis(50)).await;
        let payout = CountingPayout::default();
        let settlement =
            SettlementApi::new(db.clone(), payout.clone(), SettlementConfig::default(), EventProducers::default());
        let reconciliation = ReconciliationApi::new(db, payout.clone(), EventProducers::default());
        Self {
            db_path: url,
            payout,
            orders: OrderFlowApi::new(settlement.clone()),
            ingestion: IngestionApi::new(settlement),
            reconciliation,
            labels: HashMap::new(),
        }
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.orders.db()
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
