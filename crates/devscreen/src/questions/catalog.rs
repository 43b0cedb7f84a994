use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tracing::{debug, info};

use super::bank::{QuestionBank, QuestionBankError};
use super::domain::{Question, QuestionDomain};

const BUNDLED_DATASET: &str = include_str!("../../data/question_bank.json");

static GLOBAL_CATALOG: OnceLock<Arc<QuestionCatalog>> = OnceLock::new();

/// Where a catalog loads its question bank from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Bundled,
    Path(PathBuf),
    Inline(String),
}

impl DatasetSource {
    fn load(&self) -> Result<QuestionBank, QuestionBankError> {
        match self {
            DatasetSource::Bundled => QuestionBank::from_json_str(BUNDLED_DATASET),
            DatasetSource::Path(path) => QuestionBank::from_path(path),
            DatasetSource::Inline(raw) => QuestionBank::from_json_str(raw),
        }
    }
}

/// Read-through cache over a question bank dataset.
///
/// The bank is loaded on first access and kept until [`QuestionCatalog::invalidate`]
/// is called; there is no time-based expiry. Readers clone an `Arc` snapshot, so
/// invalidation never disturbs a query already in flight.
#[derive(Debug)]
pub struct QuestionCatalog {
    source: DatasetSource,
    cached: RwLock<Option<Arc<QuestionBank>>>,
}

impl QuestionCatalog {
    pub fn new(source: DatasetSource) -> Self {
        Self {
            source,
            cached: RwLock::new(None),
        }
    }

    /// Install the process-wide catalog. Returns the catalog already installed when
    /// called more than once; the first source wins.
    pub fn install_global(source: DatasetSource) -> Arc<QuestionCatalog> {
        GLOBAL_CATALOG
            .get_or_init(|| Arc::new(QuestionCatalog::new(source)))
            .clone()
    }

    /// Process-wide catalog, defaulting to the bundled dataset when nothing was installed.
    pub fn global() -> Arc<QuestionCatalog> {
        Self::install_global(DatasetSource::Bundled)
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    /// Current bank snapshot, loading it from the source on a cold cache.
    pub fn bank(&self) -> Result<Arc<QuestionBank>, QuestionBankError> {
        if let Some(bank) = self
            .cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(bank.clone());
        }

        let mut slot = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(bank) = slot.as_ref() {
            return Ok(bank.clone());
        }

        let bank = Arc::new(self.source.load()?);
        info!(
            questions = bank.len(),
            revision = bank.revision().unwrap_or("unversioned"),
            "question bank loaded"
        );
        *slot = Some(bank.clone());
        Ok(bank)
    }

    /// Drop the cached bank; the next access reloads from the source.
    pub fn invalidate(&self) {
        let previous = self
            .cached
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!(was_loaded = previous.is_some(), "question bank cache invalidated");
    }

    pub fn is_loaded(&self) -> bool {
        self.cached
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn questions_for_age(&self, age_months: u16) -> Result<Vec<Question>, QuestionBankError> {
        let bank = self.bank()?;
        Ok(bank
            .questions_for_age(age_months)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn questions_by_domain(
        &self,
        age_months: u16,
    ) -> Result<BTreeMap<QuestionDomain, Vec<Question>>, QuestionBankError> {
        let bank = self.bank()?;
        Ok(bank
            .questions_by_domain(age_months)
            .into_iter()
            .map(|(domain, questions)| (domain, questions.into_iter().cloned().collect()))
            .collect())
    }

    pub fn question_by_id(&self, id: &str) -> Result<Option<Question>, QuestionBankError> {
        let bank = self.bank()?;
        Ok(bank.question_by_id(id).cloned())
    }
}
