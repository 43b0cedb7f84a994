use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::warn;

use super::feed::{ChangeEvent, ChangeFeed, Entity, EventKind};
use super::StorageError;
use crate::notifications::{Notification, NotificationId, NotificationRepository};
use crate::screening::{
    PaymentIntent, PaymentStatus, Review, Screening, ScreeningId, ScreeningRepository,
    ScreeningStatus, UserId,
};
use crate::wallet::{Asset, Wallet, WalletError, WalletRepository};

#[derive(Default)]
struct Tables {
    screenings: HashMap<ScreeningId, Screening>,
    payments: HashMap<ScreeningId, PaymentIntent>,
    /// Keyed by screening id, which makes it the unique index on `review.screening_id`.
    reviews: HashMap<ScreeningId, Review>,
    notifications: Vec<Notification>,
    wallets: HashMap<UserId, Wallet>,
}

/// Process-local backend for every repository trait.
///
/// Each write runs under one table lock and publishes its change events before the
/// lock is released, so feed order matches commit order.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    feed: ChangeFeed,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_feed(ChangeFeed::default())
    }

    pub fn with_feed(feed: ChangeFeed) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            feed,
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn emit(&self, kind: EventKind, entity: Entity, record: &impl Serialize) {
        match ChangeEvent::new(kind, entity, record) {
            Ok(event) => self.feed.publish(event),
            Err(err) => warn!(entity = entity.as_str(), error = %err, "change event not published"),
        }
    }

    /// Number of reviews referencing a screening. Used to assert the unique-review
    /// invariant.
    pub fn review_count(&self, screening_id: &ScreeningId) -> Result<usize, StorageError> {
        let tables = self.tables()?;
        Ok(usize::from(tables.reviews.contains_key(screening_id)))
    }
}

impl ScreeningRepository for MemoryStore {
    fn insert_screening(
        &self,
        screening: Screening,
        payment: PaymentIntent,
    ) -> Result<Screening, StorageError> {
        let mut tables = self.tables()?;
        if tables.screenings.contains_key(&screening.id) {
            return Err(StorageError::Conflict);
        }
        tables.screenings.insert(screening.id, screening.clone());
        tables.payments.insert(screening.id, payment.clone());

        self.emit(EventKind::Insert, Entity::Screening, &screening);
        self.emit(EventKind::Insert, Entity::PaymentIntent, &payment);
        Ok(screening)
    }

    fn fetch_screening(&self, id: &ScreeningId) -> Result<Option<Screening>, StorageError> {
        Ok(self.tables()?.screenings.get(id).cloned())
    }

    fn fetch_payment(&self, id: &ScreeningId) -> Result<Option<PaymentIntent>, StorageError> {
        Ok(self.tables()?.payments.get(id).cloned())
    }

    fn fetch_review(&self, id: &ScreeningId) -> Result<Option<Review>, StorageError> {
        Ok(self.tables()?.reviews.get(id).cloned())
    }

    fn settle_payment(&self, id: &ScreeningId) -> Result<Screening, StorageError> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;

        let payment = tables.payments.get_mut(id).ok_or(StorageError::NotFound)?;
        let screening = tables.screenings.get_mut(id).ok_or(StorageError::NotFound)?;

        if payment.status != PaymentStatus::Settled {
            payment.status = PaymentStatus::Settled;
            self.emit(EventKind::Update, Entity::PaymentIntent, &*payment);
        }
        if screening.status == ScreeningStatus::PendingPayment {
            screening.status = ScreeningStatus::PendingReview;
            self.emit(EventKind::Update, Entity::Screening, &*screening);
        }

        Ok(screening.clone())
    }

    fn transition(
        &self,
        id: &ScreeningId,
        expected: ScreeningStatus,
        next: ScreeningStatus,
    ) -> Result<Screening, StorageError> {
        let mut tables = self.tables()?;
        let screening = tables.screenings.get_mut(id).ok_or(StorageError::NotFound)?;
        if screening.status != expected || !expected.can_transition_to(next) {
            return Err(StorageError::Conflict);
        }
        screening.status = next;
        let updated = screening.clone();

        self.emit(EventKind::Update, Entity::Screening, &updated);
        Ok(updated)
    }

    fn pending_reviews(&self) -> Result<Vec<Screening>, StorageError> {
        let tables = self.tables()?;
        let mut pending: Vec<Screening> = tables
            .screenings
            .values()
            .filter(|screening| {
                tables
                    .payments
                    .get(&screening.id)
                    .is_some_and(PaymentIntent::is_settled)
                    && !tables.reviews.contains_key(&screening.id)
            })
            .cloned()
            .collect();

        pending.sort_by(|left, right| {
            right
                .created_at
                .cmp(&left.created_at)
                .then_with(|| right.id.cmp(&left.id))
        });
        Ok(pending)
    }

    fn insert_review(&self, review: Review) -> Result<(Review, Screening), StorageError> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;

        if tables.reviews.contains_key(&review.screening_id) {
            return Err(StorageError::Conflict);
        }
        let screening = tables
            .screenings
            .get_mut(&review.screening_id)
            .ok_or(StorageError::NotFound)?;
        if !screening.status.can_transition_to(ScreeningStatus::Completed) {
            return Err(StorageError::InvalidState(format!(
                "screening is {}",
                screening.status.label()
            )));
        }

        screening.status = ScreeningStatus::Completed;
        let completed = screening.clone();
        tables.reviews.insert(review.screening_id, review.clone());

        self.emit(EventKind::Insert, Entity::Review, &review);
        self.emit(EventKind::Update, Entity::Screening, &completed);
        Ok((review, completed))
    }
}

impl NotificationRepository for MemoryStore {
    fn insert_notification(&self, notification: Notification) -> Result<Notification, StorageError> {
        let mut tables = self.tables()?;
        if tables
            .notifications
            .iter()
            .any(|existing| existing.id == notification.id)
        {
            return Err(StorageError::Conflict);
        }
        tables.notifications.push(notification.clone());

        self.emit(EventKind::Insert, Entity::Notification, &notification);
        Ok(notification)
    }

    fn recent_notifications(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<Notification>, StorageError> {
        let tables = self.tables()?;
        // Reverse insertion order first so the stable sort breaks timestamp ties
        // newest-inserted first.
        let mut recent: Vec<Notification> = tables
            .notifications
            .iter()
            .rev()
            .filter(|notification| notification.user_id == *user_id)
            .cloned()
            .collect();
        recent.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        recent.truncate(limit);
        Ok(recent)
    }

    fn mark_notification_read(&self, id: &NotificationId) -> Result<Notification, StorageError> {
        let mut tables = self.tables()?;
        let notification = tables
            .notifications
            .iter_mut()
            .find(|notification| notification.id == *id)
            .ok_or(StorageError::NotFound)?;
        notification.is_read = true;
        let updated = notification.clone();

        self.emit(EventKind::Update, Entity::Notification, &updated);
        Ok(updated)
    }
}

impl WalletRepository for MemoryStore {
    fn fetch_wallet(&self, owner: &UserId) -> Result<Option<Wallet>, StorageError> {
        Ok(self.tables()?.wallets.get(owner).cloned())
    }

    fn credit_wallet(
        &self,
        owner: &UserId,
        asset: Asset,
        amount: u64,
    ) -> Result<Wallet, WalletError> {
        let mut tables = self.tables()?;
        let wallet = tables.wallets.get_mut(owner).ok_or(StorageError::NotFound)?;
        wallet.credit(asset, amount)?;
        let updated = wallet.clone();

        self.emit(EventKind::Update, Entity::Wallet, &updated);
        Ok(updated)
    }

    fn create_wallet(&self, wallet: Wallet) -> Result<Wallet, StorageError> {
        let mut tables = self.tables()?;
        if tables.wallets.contains_key(&wallet.owner) {
            return Err(StorageError::Conflict);
        }
        tables.wallets.insert(wallet.owner, wallet.clone());

        self.emit(EventKind::Insert, Entity::Wallet, &wallet);
        Ok(wallet)
    }
}
