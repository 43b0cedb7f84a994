use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::NotifierConfig;
use crate::notifications::{
    NewNotification, Notification, NotificationError, NotificationId, NotificationInbox,
    NotificationRepository, NotificationSink, RefreshReason, ReviewNotifier, ScreeningLookup,
    Step, SubscriberScope,
};
use crate::questions::DomainScores;
use crate::screening::{
    FamilyId, PaymentIntent, Review, ReviewLifecycle, Screening, ScreeningId,
    ScreeningRepository, ScreeningStatus, UserId,
};
use crate::storage::{MemoryStore, StorageError};

/// Notification repository that counts every call before delegating.
#[derive(Default)]
pub(super) struct CountingRepository {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingRepository {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NotificationRepository for CountingRepository {
    fn insert_notification(&self, notification: Notification) -> Result<Notification, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_notification(notification)
    }

    fn recent_notifications(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Notification>, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.recent_notifications(user_id, limit)
    }

    fn mark_notification_read(&self, id: &NotificationId) -> Result<Notification, StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.mark_notification_read(id)
    }
}

/// Lookup that answers only after `delay`.
pub(super) struct SlowLookup {
    pub(super) delay: Duration,
    pub(super) screening: Screening,
}

#[async_trait]
impl ScreeningLookup for SlowLookup {
    async fn fetch_screening(&self, _id: &ScreeningId) -> Result<Option<Screening>, StorageError> {
        tokio::time::sleep(self.delay).await;
        Ok(Some(self.screening.clone()))
    }
}

/// Screening repository whose `fetch_screening` blocks the calling thread for `delay`.
pub(super) struct BlockingRepository {
    pub(super) inner: Arc<MemoryStore>,
    pub(super) delay: Duration,
}

impl ScreeningRepository for BlockingRepository {
    fn insert_screening(
        &self,
        screening: Screening,
        payment: PaymentIntent,
    ) -> Result<Screening, StorageError> {
        self.inner.insert_screening(screening, payment)
    }

    fn fetch_screening(&self, id: &ScreeningId) -> Result<Option<Screening>, StorageError> {
        std::thread::sleep(self.delay);
        self.inner.fetch_screening(id)
    }

    fn fetch_payment(&self, id: &ScreeningId) -> Result<Option<PaymentIntent>, StorageError> {
        self.inner.fetch_payment(id)
    }

    fn fetch_review(&self, id: &ScreeningId) -> Result<Option<Review>, StorageError> {
        self.inner.fetch_review(id)
    }

    fn settle_payment(&self, id: &ScreeningId) -> Result<Screening, StorageError> {
        self.inner.settle_payment(id)
    }

    fn transition(
        &self,
        id: &ScreeningId,
        expected: ScreeningStatus,
        next: ScreeningStatus,
    ) -> Result<Screening, StorageError> {
        self.inner.transition(id, expected, next)
    }

    fn pending_reviews(&self) -> Result<Vec<Screening>, StorageError> {
        self.inner.pending_reviews()
    }

    fn insert_review(&self, review: Review) -> Result<(Review, Screening), StorageError> {
        self.inner.insert_review(review)
    }
}

pub(super) struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn notify(&self, _notification: NewNotification) -> Result<Notification, NotificationError> {
        Err(NotificationError::Storage(StorageError::Unavailable(
            "inbox offline".to_string(),
        )))
    }
}

pub(super) type Refreshes = Arc<Mutex<Vec<RefreshReason>>>;

pub(super) fn refresh_recorder() -> (Refreshes, impl Fn(RefreshReason) + Send + Sync) {
    let log: Refreshes = Arc::default();
    let sink = log.clone();
    let hook = move |reason: RefreshReason| sink.lock().expect("refresh log poisoned").push(reason);
    (log, hook)
}

pub(super) fn recorded(log: &Refreshes) -> Vec<RefreshReason> {
    log.lock().expect("refresh log poisoned").clone()
}

pub(super) fn scope() -> SubscriberScope {
    SubscriberScope {
        family_id: FamilyId::new(),
        user_id: UserId::new(),
    }
}

pub(super) fn fast_config() -> NotifierConfig {
    NotifierConfig {
        verify_timeout: Duration::from_millis(250),
        dedup_capacity: 16,
    }
}

/// Store, lifecycle and inbox sharing one change feed.
pub(super) struct World {
    pub(super) store: Arc<MemoryStore>,
    pub(super) lifecycle: Arc<ReviewLifecycle<MemoryStore>>,
    pub(super) inbox: Arc<NotificationInbox<MemoryStore>>,
}

impl World {
    pub(super) fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            lifecycle: Arc::new(ReviewLifecycle::new(store.clone())),
            inbox: Arc::new(NotificationInbox::new(store.clone())),
            store,
        }
    }

    /// Insert a screening for `family_id` with its payment already settled.
    pub(super) fn settled_screening(&self, family_id: FamilyId) -> Screening {
        let screening = Screening {
            id: ScreeningId::new(),
            family_id,
            child_name: "Milo".to_string(),
            child_age_months: 30,
            domain_scores: DomainScores::default(),
            risk_score: Some(62.5),
            status: ScreeningStatus::PendingPayment,
            created_at: chrono::Utc::now(),
        };
        self.store
            .insert_screening(screening.clone(), PaymentIntent::pending(screening.id, 4_900))
            .expect("insert screening");
        self.lifecycle
            .settle_payment(&screening.id)
            .expect("settle payment")
    }

    pub(super) fn notifier<H>(
        &self,
        scope: SubscriberScope,
        refresh: H,
    ) -> ReviewNotifier<ReviewLifecycle<MemoryStore>, NotificationInbox<MemoryStore>, H>
    where
        H: crate::notifications::RefreshHook,
    {
        ReviewNotifier::start(
            scope,
            self.store.feed().clone(),
            self.lifecycle.clone(),
            self.inbox.clone(),
            refresh,
            fast_config(),
        )
    }

    pub(super) fn notifications_for(&self, user_id: &UserId) -> Vec<Notification> {
        self.inbox
            .recent(&user_id.to_string())
            .expect("recent notifications")
    }
}

/// Step the notifier until a review insertion has been handled.
pub(super) async fn next_review<L, N, H>(notifier: &mut ReviewNotifier<L, N, H>) -> Step
where
    L: ScreeningLookup + 'static,
    N: NotificationSink + 'static,
    H: crate::notifications::RefreshHook,
{
    loop {
        let step = tokio::time::timeout(Duration::from_secs(2), notifier.step())
            .await
            .expect("notifier produced an event in time")
            .expect("notifier still subscribed");
        if let Step::Review(_) = step {
            return step;
        }
    }
}
