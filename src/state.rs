//! Process-wide shared state: the persisted store and the services built on
//! top of it. Constructed once at startup and handed to the API layer.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, ConsoleMailer, Mailer, SeaOrmAuthService, TokenService,
};

pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub tokens: Arc<TokenService>,

    pub mailer: Arc<dyn Mailer>,

    pub auth_service: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = Arc::new(TokenService::new(&config.auth));

        let mailer: Arc<dyn Mailer> =
            Arc::new(ConsoleMailer::new(config.email.from_address.clone()));

        let auth_service: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            tokens.clone(),
            mailer.clone(),
            config.security.clone(),
            &config.auth,
            &config.email,
        ));

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            tokens,
            mailer,
            auth_service,
        })
    }
}
