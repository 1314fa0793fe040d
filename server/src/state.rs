use std::sync::Arc;

use crate::auth::{Argon2Hasher, CredentialHasher, TokenIssuer};
use crate::config::Config;
use crate::directory::OrganizerDirectory;
use crate::notify::{EmailNotifier, EmailSender, Notifier, OutboxSender, SmtpEmailSender};
use crate::store::{BuildingStore, EventStore, MemoryStore, OrganizerStore, PostgresStore};
use crate::utils::error::AppError;

/// Emails retained by the outbox when SMTP is not configured.
const OUTBOX_CAPACITY: usize = 100;

/// Shared handles for request handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<OrganizerDirectory>,
    pub buildings: Arc<dyn BuildingStore>,
    pub events: Arc<dyn EventStore>,
    pub tokens: Arc<TokenIssuer>,
    pub admin_api_key: Option<Arc<str>>,
}

impl AppState {
    /// Wire the state from explicit parts.
    pub fn new<S>(
        store: Arc<S>,
        hasher: Arc<dyn CredentialHasher>,
        notifier: Arc<dyn Notifier>,
        config: &Config,
    ) -> Self
    where
        S: OrganizerStore + BuildingStore + EventStore + 'static,
    {
        let tokens = Arc::new(TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl));
        let directory = OrganizerDirectory::new(
            store.clone(),
            hasher,
            Arc::clone(&tokens),
            notifier,
            config.directory(),
        );

        Self {
            directory: Arc::new(directory),
            buildings: store.clone(),
            events: store,
            tokens,
            admin_api_key: config.admin_api_key.as_deref().map(Arc::from),
        }
    }

    /// Wire the state the way the binary runs: Postgres when a database URL
    /// is configured, SMTP when an SMTP host is configured.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        let sender: Box<dyn EmailSender> = match &config.smtp {
            Some(smtp) => {
                tracing::info!(host = %smtp.host, port = smtp.port, "Email: SMTP transport");
                Box::new(SmtpEmailSender::new(smtp)?)
            }
            None => {
                tracing::warn!("Email: SMTP not configured, capturing messages in the outbox");
                Box::new(OutboxSender::new(OUTBOX_CAPACITY))
            }
        };
        let notifier: Arc<dyn Notifier> = Arc::new(EmailNotifier::new(sender));
        let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2Hasher::new());

        match &config.database_url {
            Some(url) => {
                let store = PostgresStore::connect(url, config.database_max_connections).await?;
                Ok(Self::new(Arc::new(store), hasher, notifier, config))
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using the in-memory store (data is not durable)");
                Ok(Self::new(Arc::new(MemoryStore::new()), hasher, notifier, config))
            }
        }
    }
}
