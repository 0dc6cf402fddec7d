use std::sync::Arc;

use tracing::error;

use threadkit_db::Database;
use threadkit_types::events::OperationDescriptor;

use crate::auth::{AllowAll, Authorizer};
use crate::dispatcher::Dispatcher;
use crate::error::ServiceError;

/// Async front for the store. Each call is authorized, run on the blocking
/// pool as one store transaction, and announced on the dispatcher once it
/// has committed.
#[derive(Clone)]
pub struct ThreadService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    db: Database,
    dispatcher: Dispatcher,
    authorizer: Arc<dyn Authorizer>,
}

impl ThreadService {
    pub fn new(db: Database, dispatcher: Dispatcher) -> Self {
        Self::with_authorizer(db, dispatcher, Arc::new(AllowAll))
    }

    pub fn with_authorizer(
        db: Database,
        dispatcher: Dispatcher,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                db,
                dispatcher,
                authorizer,
            }),
        }
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub(crate) fn authorize(&self, op: OperationDescriptor, caller: &str) -> Result<String, ServiceError> {
        self.inner.authorizer.authorize(&op, caller)
    }

    /// Run a store call off the async runtime.
    pub(crate) async fn blocking<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&Database) -> threadkit_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&inner.db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ServiceError::Join(e.to_string())
            })?
            .map_err(ServiceError::from)
    }
}
