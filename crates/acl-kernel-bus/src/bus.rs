//! The mutation bus.
//!
//! Requests from any number of callers share one request channel into a
//! single dispatcher task, and acks share one channel back out through a
//! router task that hands each ack to the caller waiting for it.
//!
//! ```text
//!   caller ──register──► Registry ◄──complete── router ◄── acks ──┐
//!     │                                                            │
//!     └──── requests ────► dispatcher ── handler ── refresh ───────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use acl_kernel_core::{Identity, StoredGrant};
use acl_kernel_store::{GrantStore, StoreError};

use crate::error::{BusError, Result};
use crate::handlers::{handler_table, MutationHandler, Refresh};
use crate::messages::{Ack, AckStatus, CorrelationId, MutationRequest};
use crate::registry::Registry;

/// Receives refetched lists after a successful mutation.
///
/// The dispatcher awaits both calls before acking, so once a caller holds
/// its ack every reader of the sink sees the mutation.
#[async_trait]
pub trait RefreshSink: Send + Sync {
    async fn replace_grants(&self, grants: Vec<StoredGrant>);
    async fn replace_identities(&self, identities: Vec<Identity>);
}

/// Configuration for the mutation bus.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Requests that may wait for the dispatcher before senders block.
    pub request_queue: usize,
    /// Acks that may wait for the router before the dispatcher blocks.
    pub ack_queue: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            request_queue: 64,
            ack_queue: 64,
        }
    }
}

struct Envelope {
    correlation: CorrelationId,
    request: MutationRequest,
}

/// Handle for submitting mutations. Cheap to clone.
///
/// The dispatcher and router tasks stop once every handle is dropped.
#[derive(Clone)]
pub struct MutationBus {
    requests: mpsc::Sender<Envelope>,
    registry: Arc<Registry>,
}

impl MutationBus {
    /// Spawn the dispatcher and router tasks on the current runtime.
    pub fn spawn(
        store: Arc<dyn GrantStore>,
        sink: Arc<dyn RefreshSink>,
        config: BusConfig,
    ) -> Self {
        let (requests, request_rx) = mpsc::channel(config.request_queue.max(1));
        let (acks, ack_rx) = mpsc::channel(config.ack_queue.max(1));
        let registry = Arc::new(Registry::new());

        let dispatcher = Dispatcher {
            store,
            sink,
            handlers: handler_table(),
            acks,
        };
        tokio::spawn(dispatcher.run(request_rx));
        tokio::spawn(route_acks(ack_rx, Arc::clone(&registry)));

        Self { requests, registry }
    }

    /// Submit a request and wait for its ack.
    ///
    /// There is no timeout: a request that is never answered waits until
    /// the bus shuts down.
    pub async fn request(&self, request: MutationRequest) -> Result<Ack> {
        let (correlation, ack) = self.registry.register();

        tracing::debug!(%correlation, kind = %request.kind, "submitting mutation");
        let envelope = Envelope {
            correlation,
            request,
        };
        if self.requests.send(envelope).await.is_err() {
            self.registry.cancel(&correlation);
            return Err(BusError::Closed);
        }

        ack.await.map_err(|_| BusError::Dropped(correlation))
    }

    /// Number of requests still awaiting an ack.
    pub fn outstanding(&self) -> usize {
        self.registry.outstanding()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

struct Dispatcher {
    store: Arc<dyn GrantStore>,
    sink: Arc<dyn RefreshSink>,
    handlers: HashMap<&'static str, Arc<dyn MutationHandler>>,
    acks: mpsc::Sender<Ack>,
}

impl Dispatcher {
    async fn run(self, mut requests: mpsc::Receiver<Envelope>) {
        while let Some(Envelope {
            correlation,
            request,
        }) = requests.recv().await
        {
            let ack = self.dispatch(correlation, request).await;
            if self.acks.send(ack).await.is_err() {
                tracing::warn!(%correlation, "ack router gone, stopping dispatcher");
                break;
            }
        }
        tracing::debug!("mutation dispatcher stopped");
    }

    async fn dispatch(&self, correlation: CorrelationId, request: MutationRequest) -> Ack {
        let MutationRequest { kind, body } = request;

        let Some(handler) = self.handlers.get(kind.as_str()) else {
            tracing::warn!(%correlation, %kind, "no handler for request kind");
            return Ack {
                correlation,
                kind,
                status: AckStatus::ServerError,
                grant: None,
            };
        };

        let (status, grant) = match handler.handle(self.store.as_ref(), body).await {
            Ok(outcome) if outcome.status.is_success() => {
                match self.refresh(outcome.refresh).await {
                    Ok(()) => (outcome.status, outcome.grant),
                    Err(e) => {
                        tracing::warn!(%correlation, error = %e, "refetch after mutation failed");
                        (AckStatus::ServerError, outcome.grant)
                    }
                }
            }
            Ok(outcome) => (outcome.status, outcome.grant),
            Err(e) => {
                tracing::warn!(%correlation, %kind, error = %e, "mutation failed");
                (AckStatus::ServerError, None)
            }
        };

        Ack {
            correlation,
            kind,
            status,
            grant,
        }
    }

    /// Refetch changed lists and push them to the sink.
    async fn refresh(&self, refresh: Refresh) -> std::result::Result<(), StoreError> {
        if refresh.grants {
            let grants = self.store.list_grants().await?;
            tracing::debug!(grants = grants.len(), "refetched grants");
            self.sink.replace_grants(grants).await;
        }
        if refresh.identities {
            let identities = self.store.list_identities().await?;
            tracing::debug!(identities = identities.len(), "refetched identities");
            self.sink.replace_identities(identities).await;
        }
        Ok(())
    }
}

async fn route_acks(mut acks: mpsc::Receiver<Ack>, registry: Arc<Registry>) {
    while let Some(ack) = acks.recv().await {
        let correlation = ack.correlation;
        if !registry.complete(ack) {
            tracing::warn!(%correlation, "ack for a request nobody is waiting on");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use acl_kernel_core::{Grant, Id};
    use acl_kernel_eval::Permitted;
    use acl_kernel_store::MemoryStore;

    use crate::messages::{GrantRequest, Rejection, KIND_GRANT};

    #[derive(Default)]
    struct RecordingSink {
        grants: Mutex<Vec<Vec<StoredGrant>>>,
        identities: Mutex<Vec<Vec<Identity>>>,
    }

    #[async_trait]
    impl RefreshSink for RecordingSink {
        async fn replace_grants(&self, grants: Vec<StoredGrant>) {
            self.grants.lock().unwrap().push(grants);
        }

        async fn replace_identities(&self, identities: Vec<Identity>) {
            self.identities.lock().unwrap().push(identities);
        }
    }

    fn create(n: u128) -> MutationRequest {
        MutationRequest::grant(&GrantRequest::Create {
            grant: Grant::new(Id::from_u128(n), Id::from_u128(2), Id::from_u128(3)),
            permitted: Permitted::All,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_refresh_happens_before_ack() {
        let sink = Arc::new(RecordingSink::default());
        let bus = MutationBus::spawn(
            Arc::new(MemoryStore::new()),
            sink.clone(),
            BusConfig::default(),
        );

        let ack = bus.request(create(1)).await.unwrap();
        assert_eq!(ack.status, AckStatus::Created);
        assert_eq!(ack.kind, KIND_GRANT);

        let pushed = sink.grants.lock().unwrap();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].len(), 1);
        assert_eq!(Some(pushed[0][0].id), ack.grant);
        assert!(sink.identities.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejection_does_not_refresh() {
        let sink = Arc::new(RecordingSink::default());
        let bus = MutationBus::spawn(
            Arc::new(MemoryStore::new()),
            sink.clone(),
            BusConfig::default(),
        );

        let request = MutationRequest::grant(&GrantRequest::Create {
            grant: Grant::new(Id::from_u128(1), Id::from_u128(2), Id::from_u128(3)),
            permitted: Permitted::None,
        })
        .unwrap();

        let ack = bus.request(request).await.unwrap();
        assert_eq!(ack.status, AckStatus::Rejected(Rejection::Forbidden));
        assert!(sink.grants.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kind_gets_server_error_and_bus_survives() {
        let bus = MutationBus::spawn(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingSink::default()),
            BusConfig::default(),
        );

        let ack = bus
            .request(MutationRequest::new("group", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(ack.status, AckStatus::ServerError);
        assert_eq!(ack.kind, "group");

        let ack = bus.request(create(1)).await.unwrap();
        assert_eq!(ack.status, AckStatus::Created);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_get_their_own_acks() {
        let bus = MutationBus::spawn(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingSink::default()),
            BusConfig {
                request_queue: 4,
                ack_queue: 4,
            },
        );

        let mut tasks = Vec::new();
        for n in 0..50u128 {
            let bus = bus.clone();
            tasks.push(tokio::spawn(async move {
                let ack = bus.request(create(100 + n)).await.unwrap();
                (n, ack)
            }));
        }

        let mut grant_ids = std::collections::HashSet::new();
        for task in tasks {
            let (_, ack) = task.await.unwrap();
            assert_eq!(ack.status, AckStatus::Created);
            assert!(grant_ids.insert(ack.grant.unwrap()));
        }

        assert_eq!(grant_ids.len(), 50);
        assert_eq!(bus.outstanding(), 0);
    }
}
