//! Age-gated question bank, domain partitioning, and risk classification.

mod bank;
mod catalog;
mod domain;
pub mod router;

pub use bank::{QuestionBank, QuestionBankError, SUPPORTED_DATASET_VERSION};
pub use catalog::{DatasetSource, QuestionCatalog};
pub use domain::{AgeRange, DomainScores, Question, QuestionDomain, QuestionId, RiskLevel};
pub use router::question_router;
