//! Minimal wallet bookkeeping: creating a wallet on first top-up and crediting a
//! single asset.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::screening::UserId;
use crate::storage::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    Usd,
    Credits,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub owner: UserId,
    pub usd: u64,
    pub credits: u64,
}

impl Wallet {
    pub fn empty(owner: UserId) -> Self {
        Self {
            owner,
            usd: 0,
            credits: 0,
        }
    }

    pub fn balance(&self, asset: Asset) -> u64 {
        match asset {
            Asset::Usd => self.usd,
            Asset::Credits => self.credits,
        }
    }

    /// Add `amount` to one asset, leaving the other untouched.
    pub fn credit(&mut self, asset: Asset, amount: u64) -> Result<(), WalletError> {
        let slot = match asset {
            Asset::Usd => &mut self.usd,
            Asset::Credits => &mut self.credits,
        };
        *slot = slot
            .checked_add(amount)
            .ok_or(WalletError::Overflow { asset })?;
        Ok(())
    }
}

/// Storage abstraction for wallets.
pub trait WalletRepository: Send + Sync {
    fn fetch_wallet(&self, owner: &UserId) -> Result<Option<Wallet>, StorageError>;

    /// Credit an existing wallet in place. `Storage(NotFound)` when the owner has none.
    fn credit_wallet(&self, owner: &UserId, asset: Asset, amount: u64)
        -> Result<Wallet, WalletError>;

    /// `Conflict` when the owner already has a wallet.
    fn create_wallet(&self, wallet: Wallet) -> Result<Wallet, StorageError>;
}

pub struct WalletService<R> {
    repository: Arc<R>,
}

impl<R> WalletService<R>
where
    R: WalletRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub fn balance(&self, owner: &UserId) -> Result<Wallet, WalletError> {
        Ok(self
            .repository
            .fetch_wallet(owner)?
            .unwrap_or_else(|| Wallet::empty(*owner)))
    }

    /// Credit `amount` of `asset`, creating the wallet with zero balances first when
    /// the owner has none.
    pub fn top_up(&self, owner: UserId, asset: Asset, amount: u64) -> Result<Wallet, WalletError> {
        if amount == 0 {
            return Err(WalletError::InvalidAmount);
        }

        match self.repository.credit_wallet(&owner, asset, amount) {
            Ok(wallet) => Ok(wallet),
            Err(WalletError::Storage(StorageError::NotFound)) => {
                let mut wallet = Wallet::empty(owner);
                wallet.credit(asset, amount)?;
                match self.repository.create_wallet(wallet) {
                    Ok(created) => {
                        info!(owner = %owner, ?asset, amount, "wallet created on first top-up");
                        Ok(created)
                    }
                    // Another top-up created it first; credit the existing wallet.
                    Err(StorageError::Conflict) => {
                        self.repository.credit_wallet(&owner, asset, amount)
                    }
                    Err(other) => Err(other.into()),
                }
            }
            Err(other) => Err(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("top-up amount must be positive")]
    InvalidAmount,
    #[error("{asset:?} balance would overflow")]
    Overflow { asset: Asset },
    #[error(transparent)]
    Storage(#[from] StorageError),
}
