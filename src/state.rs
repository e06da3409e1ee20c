use std::sync::Arc;

use surrealdb::{
    Surreal,
    engine::any::{Any, connect},
    opt::auth::Root,
};
use tracing::info;

use crate::config::Config;
use crate::db::{bootstrap_admin, init_schema};
use crate::errors::Result;
use crate::notify::{LogMailer, Mailer};

#[derive(Clone)]
pub struct AppState {
    pub sdb: Surreal<Any>,
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init(config: Config) -> Result<Self> {
        Self::with_mailer(config, Arc::new(LogMailer)).await
    }

    pub async fn with_mailer(config: Config, mailer: Arc<dyn Mailer>) -> Result<Self> {
        let sdb = connect(config.database_url.as_str()).await?;
        if let (Some(username), Some(password)) = (&config.database_user, &config.database_pass) {
            sdb.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        }
        sdb.use_ns(config.database_ns.as_str())
            .use_db(config.database_db.as_str())
            .await?;
        info!(
            "connected to {} ({}/{})",
            config.database_url, config.database_ns, config.database_db
        );

        init_schema(&sdb).await?;
        if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
            bootstrap_admin(&sdb, email, password).await?;
        }

        Ok(Self {
            sdb,
            config: Arc::new(config),
            mailer,
        })
    }
}
