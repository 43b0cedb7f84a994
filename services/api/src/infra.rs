use devscreen::config::{NotifierConfig, QuestionBankConfig};
use devscreen::notifications::{NotificationInbox, RefreshHook, ReviewNotifier, SubscriberScope};
use devscreen::questions::{DatasetSource, QuestionCatalog};
use devscreen::screening::{ProportionalScorer, ReviewLifecycle, SubmissionService};
use devscreen::storage::MemoryStore;
use devscreen::wallet::WalletService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Price attached to every new screening's payment intent.
pub(crate) const SCREENING_PRICE_CENTS: u64 = 4_900;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Every service wired over one in-memory store and its change feed.
pub(crate) struct Services {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) catalog: Arc<QuestionCatalog>,
    pub(crate) submissions: Arc<SubmissionService<MemoryStore, ProportionalScorer>>,
    pub(crate) lifecycle: Arc<ReviewLifecycle<MemoryStore>>,
    pub(crate) inbox: Arc<NotificationInbox<MemoryStore>>,
    pub(crate) wallets: WalletService<MemoryStore>,
    pub(crate) notifier: NotifierConfig,
}

pub(crate) type FamilyNotifier<H> =
    ReviewNotifier<ReviewLifecycle<MemoryStore>, NotificationInbox<MemoryStore>, H>;

impl Services {
    pub(crate) fn in_memory(catalog: Arc<QuestionCatalog>, notifier: NotifierConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            submissions: Arc::new(SubmissionService::new(
                store.clone(),
                catalog.clone(),
                Arc::new(ProportionalScorer),
                SCREENING_PRICE_CENTS,
            )),
            lifecycle: Arc::new(ReviewLifecycle::new(store.clone())),
            inbox: Arc::new(NotificationInbox::new(store.clone())),
            wallets: WalletService::new(store.clone()),
            catalog,
            store,
            notifier,
        }
    }

    /// Subscribe a family to review notifications using the configured bounds.
    pub(crate) fn review_notifier<H>(
        &self,
        scope: SubscriberScope,
        refresh: H,
    ) -> FamilyNotifier<H>
    where
        H: RefreshHook,
    {
        ReviewNotifier::start(
            scope,
            self.store.feed().clone(),
            self.lifecycle.clone(),
            self.inbox.clone(),
            refresh,
            self.notifier,
        )
    }
}

pub(crate) fn dataset_source(config: &QuestionBankConfig) -> DatasetSource {
    match &config.dataset_path {
        Some(path) => DatasetSource::Path(path.clone()),
        None => DatasetSource::Bundled,
    }
}
