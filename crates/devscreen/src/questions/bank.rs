use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::domain::{Question, QuestionDomain, QuestionId};

/// Dataset layout version understood by [`QuestionBank::from_reader`].
pub const SUPPORTED_DATASET_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct Dataset {
    version: u32,
    #[serde(default)]
    revision: Option<String>,
    questions: Vec<Question>,
}

/// Immutable, validated question bank.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    revision: Option<String>,
    questions: Vec<Question>,
    index: HashMap<QuestionId, usize>,
}

impl QuestionBank {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, QuestionBankError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, QuestionBankError> {
        let dataset: Dataset = serde_json::from_reader(reader)?;
        Self::from_dataset(dataset)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, QuestionBankError> {
        let dataset: Dataset = serde_json::from_str(raw)?;
        Self::from_dataset(dataset)
    }

    fn from_dataset(dataset: Dataset) -> Result<Self, QuestionBankError> {
        if dataset.version != SUPPORTED_DATASET_VERSION {
            return Err(QuestionBankError::UnsupportedVersion(dataset.version));
        }

        let mut index = HashMap::with_capacity(dataset.questions.len());
        for (position, question) in dataset.questions.iter().enumerate() {
            let range = question.age_range_months;
            if range.start > range.end {
                return Err(QuestionBankError::InvalidAgeRange {
                    id: question.id.clone(),
                    start: range.start,
                    end: range.end,
                });
            }
            if index.insert(question.id.clone(), position).is_some() {
                return Err(QuestionBankError::DuplicateQuestion(question.id.clone()));
            }
        }

        Ok(Self {
            revision: dataset.revision,
            questions: dataset.questions,
            index,
        })
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Every question whose inclusive age range contains `age_months`.
    pub fn questions_for_age(&self, age_months: u16) -> Vec<&Question> {
        self.questions
            .iter()
            .filter(|question| question.age_range_months.contains(age_months))
            .collect()
    }

    /// Age-filtered questions keyed by domain, each list ascending by `order`.
    ///
    /// All four domains are always present; a domain without matches maps to an
    /// empty list.
    pub fn questions_by_domain(&self, age_months: u16) -> BTreeMap<QuestionDomain, Vec<&Question>> {
        let mut grouped: BTreeMap<QuestionDomain, Vec<&Question>> = QuestionDomain::ordered()
            .into_iter()
            .map(|domain| (domain, Vec::new()))
            .collect();

        for question in self.questions_for_age(age_months) {
            grouped.entry(question.domain).or_default().push(question);
        }

        for questions in grouped.values_mut() {
            questions.sort_by(|left, right| {
                left.order
                    .cmp(&right.order)
                    .then_with(|| left.id.cmp(&right.id))
            });
        }

        grouped
    }

    pub fn question_by_id(&self, id: &str) -> Option<&Question> {
        self.index
            .get(&QuestionId(id.to_string()))
            .map(|&position| &self.questions[position])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QuestionBankError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid question bank data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported question bank version {0}")]
    UnsupportedVersion(u32),
    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
    #[error("question {id} has inverted age range {start}..={end}")]
    InvalidAgeRange { id: QuestionId, start: u16, end: u16 },
}
