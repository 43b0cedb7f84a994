use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::channel::{NotificationChannel, Subscription};
use super::inbox::{NewNotification, NotificationId, NotificationSink};
use crate::config::NotifierConfig;
use crate::screening::{
    FamilyId, Review, ReviewId, ReviewLifecycle, Screening, ScreeningId, ScreeningRepository,
    UserId,
};
use crate::storage::{ChangeEvent, ChangeFeed, Entity, EqualityFilter, EventKind, StorageError};

/// Out-of-band fetch used to verify which family a reviewed screening belongs to.
#[async_trait]
pub trait ScreeningLookup: Send + Sync {
    async fn fetch_screening(&self, id: &ScreeningId) -> Result<Option<Screening>, StorageError>;
}

#[async_trait]
impl<R> ScreeningLookup for ReviewLifecycle<R>
where
    R: ScreeningRepository + 'static,
{
    /// Runs the repository read on the blocking pool so the caller's timeout can
    /// abandon it.
    async fn fetch_screening(&self, id: &ScreeningId) -> Result<Option<Screening>, StorageError> {
        let repository = Arc::clone(self.repository());
        let id = *id;
        tokio::task::spawn_blocking(move || repository.fetch_screening(&id))
            .await
            .map_err(|err| StorageError::Unavailable(format!("screening lookup aborted: {err}")))?
    }
}

/// Why the dependent view is being asked to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    ScreeningUpdated(ScreeningId),
    ReviewInserted,
}

/// Callback that re-fetches whatever view depends on screening state.
pub trait RefreshHook: Send + Sync {
    fn refresh(&self, reason: RefreshReason);
}

impl<F> RefreshHook for F
where
    F: Fn(RefreshReason) + Send + Sync,
{
    fn refresh(&self, reason: RefreshReason) {
        self(reason)
    }
}

/// Whose notifications a notifier delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberScope {
    pub family_id: FamilyId,
    pub user_id: UserId,
}

/// What happened to one review-insertion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Notified(NotificationId),
    /// The review id was already handled by this subscription.
    Duplicate,
    /// The screening belongs to another family.
    OutOfScope,
    /// The screening could not be fetched in time, or does not exist.
    Unverified,
    /// The payload did not decode into a review.
    Malformed,
    /// Verified, but the sink failed to store the notification.
    SinkFailed,
}

/// Insertion-ordered set of handled review ids with a fixed capacity; the oldest
/// id is evicted first.
#[derive(Debug)]
pub struct ProcessedReviews {
    capacity: usize,
    order: VecDeque<ReviewId>,
    seen: HashSet<ReviewId>,
}

impl ProcessedReviews {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    pub fn contains(&self, id: &ReviewId) -> bool {
        self.seen.contains(id)
    }

    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, id: ReviewId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        self.order.push_back(id);
        true
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }
}

/// Result of [`ReviewNotifier::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Refreshed,
    Review(Delivery),
}

enum Incoming {
    ScreeningUpdated(ChangeEvent),
    ReviewInserted(ChangeEvent),
}

/// Turns review insertions into at-most-once, family-scoped notifications.
///
/// Holds two subscriptions: screening updates filtered to the family, and all
/// review insertions. Review rows carry no family column, so ownership is checked by
/// fetching the screening. The processed-id set lives exactly as long as the
/// current subscriptions and is cleared on [`ReviewNotifier::close`].
pub struct ReviewNotifier<L, N, H> {
    scope: SubscriberScope,
    feed: ChangeFeed,
    lookup: Arc<L>,
    sink: Arc<N>,
    refresh: H,
    verify_timeout: Duration,
    processed: ProcessedReviews,
    screening_updates: Option<Subscription>,
    review_inserts: Option<Subscription>,
}

impl<L, N, H> ReviewNotifier<L, N, H>
where
    L: ScreeningLookup + 'static,
    N: NotificationSink + 'static,
    H: RefreshHook,
{
    /// Build a notifier and open both subscriptions for `scope`.
    pub fn start(
        scope: SubscriberScope,
        feed: ChangeFeed,
        lookup: Arc<L>,
        sink: Arc<N>,
        refresh: H,
        config: NotifierConfig,
    ) -> Self {
        let mut notifier = Self {
            scope,
            feed,
            lookup,
            sink,
            refresh,
            verify_timeout: config.verify_timeout,
            processed: ProcessedReviews::new(config.dedup_capacity),
            screening_updates: None,
            review_inserts: None,
        };
        notifier.open();
        notifier
    }

    fn open(&mut self) {
        let screenings = NotificationChannel::new(EventKind::Update, Entity::Screening)
            .with_filter(EqualityFilter::new(
                "family_id",
                self.scope.family_id.to_string(),
            ));
        let reviews = NotificationChannel::new(EventKind::Insert, Entity::Review);

        self.screening_updates = Some(screenings.subscribe(&self.feed));
        self.review_inserts = Some(reviews.subscribe(&self.feed));
        info!(family_id = %self.scope.family_id, "review notifier subscribed");
    }

    pub fn scope(&self) -> SubscriberScope {
        self.scope
    }

    pub fn is_active(&self) -> bool {
        self.screening_updates
            .as_ref()
            .is_some_and(Subscription::is_active)
            && self
                .review_inserts
                .as_ref()
                .is_some_and(Subscription::is_active)
    }

    pub fn processed(&self) -> &ProcessedReviews {
        &self.processed
    }

    pub fn verify_timeout(&self) -> Duration {
        self.verify_timeout
    }

    /// Release both subscriptions and forget every processed id. Idempotent; run it
    /// on unmount, logout, and before switching scope.
    pub fn close(&mut self) {
        if let Some(mut subscription) = self.screening_updates.take() {
            subscription.unsubscribe();
        }
        if let Some(mut subscription) = self.review_inserts.take() {
            subscription.unsubscribe();
        }
        self.processed.clear();
    }

    /// Tear down the current subscriptions and resubscribe for a new family.
    pub fn rescope(&mut self, scope: SubscriberScope) {
        self.close();
        self.scope = scope;
        self.open();
    }

    /// Process events until both subscriptions end.
    pub async fn run(&mut self) {
        while let Some(incoming) = self.next_incoming().await {
            match incoming {
                Incoming::ScreeningUpdated(event) => self.handle_screening_updated(&event),
                Incoming::ReviewInserted(event) => {
                    self.handle_review_inserted(&event).await;
                }
            }
        }
    }

    /// Wait for and process a single event. Returns `None` once closed.
    pub async fn step(&mut self) -> Option<Step> {
        let incoming = self.next_incoming().await?;
        Some(match incoming {
            Incoming::ScreeningUpdated(event) => {
                self.handle_screening_updated(&event);
                Step::Refreshed
            }
            Incoming::ReviewInserted(event) => {
                Step::Review(self.handle_review_inserted(&event).await)
            }
        })
    }

    async fn next_incoming(&mut self) -> Option<Incoming> {
        let (Some(screenings), Some(reviews)) = (
            self.screening_updates.as_mut(),
            self.review_inserts.as_mut(),
        ) else {
            return None;
        };

        tokio::select! {
            Some(event) = screenings.next() => Some(Incoming::ScreeningUpdated(event)),
            Some(event) = reviews.next() => Some(Incoming::ReviewInserted(event)),
            else => None,
        }
    }

    /// Screening updates only refresh; refresh is idempotent so nothing is de-duplicated.
    pub fn handle_screening_updated(&self, event: &ChangeEvent) {
        match event.decode::<Screening>() {
            Ok(screening) => self
                .refresh
                .refresh(RefreshReason::ScreeningUpdated(screening.id)),
            Err(err) => warn!(error = %err, "discarding malformed screening update"),
        }
    }

    /// Apply de-duplication and scope verification to one review insertion, then
    /// refresh the dependent view whatever the outcome.
    pub async fn handle_review_inserted(&mut self, event: &ChangeEvent) -> Delivery {
        let delivery = self.deliver(event).await;
        self.refresh.refresh(RefreshReason::ReviewInserted);
        delivery
    }

    async fn deliver(&mut self, event: &ChangeEvent) -> Delivery {
        let review: Review = match event.decode() {
            Ok(review) => review,
            Err(err) => {
                warn!(error = %err, "discarding malformed review insertion");
                return Delivery::Malformed;
            }
        };

        if self.processed.contains(&review.review_id) {
            debug!(review_id = %review.review_id, "duplicate review insertion ignored");
            return Delivery::Duplicate;
        }

        let fetched = tokio::time::timeout(
            self.verify_timeout,
            self.lookup.fetch_screening(&review.screening_id),
        )
        .await;

        let screening = match fetched {
            Ok(Ok(Some(screening))) => screening,
            Ok(Ok(None)) => {
                debug!(screening_id = %review.screening_id, "reviewed screening not visible");
                return Delivery::Unverified;
            }
            Ok(Err(err)) => {
                warn!(screening_id = %review.screening_id, error = %err, "scope verification failed");
                return Delivery::Unverified;
            }
            Err(_) => {
                warn!(
                    screening_id = %review.screening_id,
                    timeout_ms = self.verify_timeout.as_millis() as u64,
                    "scope verification timed out"
                );
                return Delivery::Unverified;
            }
        };

        if screening.family_id != self.scope.family_id {
            debug!(screening_id = %screening.id, "review belongs to another family");
            return Delivery::OutOfScope;
        }

        self.processed.insert(review.review_id);

        let notification = NewNotification {
            user_id: self.scope.user_id,
            screening_id: Some(screening.id),
            title: "Clinical review ready".to_string(),
            message: review_message(&screening, &review),
        };

        match self.sink.notify(notification).await {
            Ok(stored) => {
                info!(review_id = %review.review_id, notification_id = %stored.id, "family notified");
                Delivery::Notified(stored.id)
            }
            Err(err) => {
                warn!(review_id = %review.review_id, error = %err, "notification could not be stored");
                Delivery::SinkFailed
            }
        }
    }
}

fn review_message(screening: &Screening, review: &Review) -> String {
    match review.clinical_risk_level {
        Some(level) => format!(
            "A clinician reviewed {}'s screening and rated developmental risk as {}.",
            screening.child_name,
            level.label()
        ),
        None => format!(
            "A clinician has reviewed {}'s screening.",
            screening.child_name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_reviews_evicts_oldest_when_full() {
        let mut processed = ProcessedReviews::new(2);
        let first = ReviewId::new();
        let second = ReviewId::new();
        let third = ReviewId::new();

        assert!(processed.insert(first));
        assert!(!processed.insert(first));
        assert!(processed.insert(second));
        assert!(processed.insert(third));

        assert_eq!(processed.len(), 2);
        assert!(!processed.contains(&first));
        assert!(processed.contains(&second));
        assert!(processed.contains(&third));

        processed.clear();
        assert!(processed.is_empty());
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut processed = ProcessedReviews::new(0);
        let id = ReviewId::new();
        assert!(processed.insert(id));
        assert!(processed.contains(&id));
    }
}
