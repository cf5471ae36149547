use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::{event_verifier::EventVerifier, store::Store},
    domain::entities::{
        customer::Customer,
        event::ProviderEvent,
        invoice::Invoice,
        payment_method::PaymentMethod,
        resource::{ProviderObject, ProviderObjectError, Resource},
        subscription::Subscription,
    },
};

// ============================================================================
// Handlers
// ============================================================================

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &ProviderEvent) -> AppResult<()>;
}

#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(ProviderEvent) -> Fut + Send + Sync,
    Fut: Future<Output = AppResult<()>> + Send,
{
    async fn handle(&self, event: &ProviderEvent) -> AppResult<()> {
        (self)(event.clone()).await
    }
}

type HandlerMap = HashMap<String, Arc<dyn EventHandler>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran and succeeded.
    Dispatched,
    /// First delivery, but nothing is registered for the event type.
    NoHandler,
    /// Seen before; not dispatched again.
    Duplicate,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Verifies pushed events, drops redeliveries and routes the rest by type.
///
/// Dispatch works on a snapshot of the handler map, so a slow handler never
/// blocks registration or other dispatches.
pub struct WebhookDispatcher {
    verifier: Arc<dyn EventVerifier>,
    store: Arc<dyn Store>,
    handlers: RwLock<Arc<HandlerMap>>,
}

impl WebhookDispatcher {
    pub fn new(verifier: Arc<dyn EventVerifier>, store: Arc<dyn Store>) -> Self {
        Self {
            verifier,
            store,
            handlers: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Register `handler` for `event_type`, replacing any previous one.
    pub fn handle<H>(&self, event_type: &str, handler: H)
    where
        H: EventHandler + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = HandlerMap::clone(&handlers);
        next.insert(event_type.to_string(), Arc::new(handler));
        *handlers = Arc::new(next);
    }

    fn handler_for(&self, event_type: &str) -> Option<Arc<dyn EventHandler>> {
        let snapshot = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        snapshot.get(event_type).cloned()
    }

    /// Verify a raw delivery and dispatch it.
    pub async fn receive(&self, payload: &[u8], signature: &str) -> AppResult<DispatchOutcome> {
        let event = self.verifier.verify(payload, signature)?;
        self.dispatch(event).await
    }

    /// Log the event id and run the registered handler on first sight.
    ///
    /// A handler error is reported as `Internal`; the event stays logged, so
    /// a redelivery is answered as a duplicate.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn dispatch(&self, event: ProviderEvent) -> AppResult<DispatchOutcome> {
        match self.store.log_event(&event.id).await {
            Ok(()) => {}
            Err(AppError::DuplicateEvent) => {
                tracing::debug!("Duplicate event, not dispatching");
                return Ok(DispatchOutcome::Duplicate);
            }
            Err(err) => return Err(err),
        }

        let Some(handler) = self.handler_for(&event.event_type) else {
            tracing::debug!("No handler registered");
            return Ok(DispatchOutcome::NoHandler);
        };

        handler.handle(&event).await.map_err(|err| {
            tracing::error!(error = %err, "Event handler failed");
            AppError::Internal(format!(
                "handler for {} failed: {}",
                event.event_type, err
            ))
        })?;
        Ok(DispatchOutcome::Dispatched)
    }
}

// ============================================================================
// Store sync
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Upsert,
    Remove,
}

/// Mirrors the event's object into the store, keeping locally owned fields.
pub struct StoreSyncHandler {
    store: Arc<dyn Store>,
    mode: SyncMode,
}

impl StoreSyncHandler {
    pub fn new(store: Arc<dyn Store>, mode: SyncMode) -> Self {
        Self { store, mode }
    }

    async fn upsert(&self, object: ProviderObject) -> AppResult<()> {
        match object {
            ProviderObject::Customer(attrs) => {
                let customer = match self.store.customer_by_id(&attrs.id).await? {
                    Some(mut existing) => {
                        existing.refresh(attrs);
                        existing
                    }
                    None => Customer::new(attrs),
                };
                self.store.put(Resource::from(&customer)).await
            }
            ProviderObject::Invoice(attrs) => {
                let invoice = Invoice::new(attrs).with_updated_at(Utc::now());
                self.store.put(Resource::from(&invoice)).await
            }
            ProviderObject::PaymentMethod(attrs) => {
                if attrs.customer.is_none() {
                    tracing::debug!(payment_method_id = %attrs.id, "Skipping payment method without customer");
                    return Ok(());
                }
                let is_default = self
                    .store
                    .payment_method_by_id(&attrs.id)
                    .await?
                    .is_some_and(|pm| pm.is_default());
                let pm = PaymentMethod::new(attrs).with_default(is_default);
                self.store.put(Resource::from(&pm)).await
            }
            ProviderObject::Subscription(attrs) => {
                let subscription = Subscription::from_attributes(attrs);
                self.store.put(Resource::from(&subscription)).await
            }
        }
    }

    async fn remove(&self, object: ProviderObject) -> AppResult<()> {
        match object {
            ProviderObject::Customer(attrs) => {
                self.store.remove(Resource::from(&Customer::new(attrs))).await
            }
            ProviderObject::Invoice(attrs) => {
                self.store.remove(Resource::from(&Invoice::new(attrs))).await
            }
            ProviderObject::PaymentMethod(attrs) => {
                self.store
                    .remove(Resource::from(&PaymentMethod::new(attrs)))
                    .await
            }
            ProviderObject::Subscription(attrs) => {
                self.store
                    .remove(Resource::from(&Subscription::from_attributes(attrs)))
                    .await
            }
        }
    }
}

impl From<ProviderObjectError> for AppError {
    fn from(err: ProviderObjectError) -> Self {
        match err {
            ProviderObjectError::UnknownKind(kind) => AppError::UnknownResource(kind),
            malformed @ ProviderObjectError::Malformed { .. } => {
                AppError::InvalidInput(malformed.to_string())
            }
        }
    }
}

#[async_trait]
impl EventHandler for StoreSyncHandler {
    async fn handle(&self, event: &ProviderEvent) -> AppResult<()> {
        let object = ProviderObject::from_value(event.object().clone())?;
        tracing::debug!(object_id = %object.id(), mode = ?self.mode, "Syncing event object");
        match self.mode {
            SyncMode::Upsert => self.upsert(object).await,
            SyncMode::Remove => self.remove(object).await,
        }
    }
}

/// Event types mirrored into the store by default.
pub const UPSERT_EVENTS: &[&str] = &[
    "customer.updated",
    "customer.subscription.created",
    "customer.subscription.updated",
    "customer.subscription.deleted",
    "invoice.created",
    "invoice.finalized",
    "invoice.updated",
    "invoice.paid",
    "invoice.payment_succeeded",
    "invoice.payment_failed",
    "invoice.voided",
    "invoice.marked_uncollectible",
    "payment_method.updated",
    "payment_method.automatically_updated",
];

pub const REMOVE_EVENTS: &[&str] = &["customer.deleted", "payment_method.detached"];

/// Register the store sync handlers on `dispatcher`.
pub fn register_store_sync(dispatcher: &WebhookDispatcher, store: Arc<dyn Store>) {
    for event_type in UPSERT_EVENTS {
        dispatcher.handle(
            event_type,
            StoreSyncHandler::new(store.clone(), SyncMode::Upsert),
        );
    }
    for event_type in REMOVE_EVENTS {
        dispatcher.handle(
            event_type,
            StoreSyncHandler::new(store.clone(), SyncMode::Remove),
        );
    }
}
