use std::time::Duration;

use cucumber::World;
use log::*;
use topup_engine::{
    events::EventProducers,
    test_utils::{
        prepare_env::{create_database, random_db_path, run_migrations},
        scripted_gateway::ScriptedGateway,
    },
    DeductionApi,
    DeductionPolicy,
    OrderFlowApi,
    PollPolicy,
    RechargeError,
    ReconcilePolicy,
    SqliteDatabase,
    TransitionOutcome,
};

#[derive(Default, Debug, World)]
pub struct TopupWorld {
    pub system: Option<TopupSystem>,
    pub last_result: Option<Result<TransitionOutcome, RechargeError>>,
}

#[derive(Debug)]
pub struct TopupSystem {
    pub db_path: String,
    pub api: OrderFlowApi<SqliteDatabase, ScriptedGateway>,
    pub deductions: DeductionApi<SqliteDatabase>,
}

impl TopupWorld {
    pub fn system(&self) -> &TopupSystem {
        self.system.as_ref().expect("Top-up system not initialised")
    }

    pub fn api(&self) -> &OrderFlowApi<SqliteDatabase, ScriptedGateway> {
        &self.system().api
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api().db()
    }

    pub fn gateway(&self) -> &ScriptedGateway {
        self.api().gateway()
    }
}

impl TopupSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let policy = PollPolicy {
            min_order_age: Duration::from_secs(5 * 60),
            max_pending_age: Duration::from_secs(30 * 60),
            gateway_timeout: Duration::from_secs(1),
            concurrency: 2,
        };
        let api = OrderFlowApi::new(
            db.clone(),
            ScriptedGateway::new(),
            ReconcilePolicy::default(),
            policy,
            EventProducers::default(),
        );
        let deductions = DeductionApi::new(db, DeductionPolicy::default());
        Self { db_path: url, api, deductions }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
