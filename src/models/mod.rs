pub mod outcome;
pub mod subject;

pub use outcome::{FailureReason, QueryOutcome, ScoreReport};
pub use subject::{NewSubject, Subject};
