//! Per-attempt interaction automaton.
//!
//! Takes one posting URL plus an applicant profile and drives the full
//! interaction sequence: navigate, detect the application form, map profile
//! values onto fields, fill with human-like pacing, resolve or report
//! anti-bot challenges, submit, and verify the confirmation signal. Every
//! path out of the automaton is a classified [`AttemptOutcome`].

pub mod automaton;
pub mod challenge;
pub mod form;
pub mod mapping;
pub mod outcome;

pub use automaton::{AttemptRequest, InteractionAutomaton};
pub use challenge::{ChallengeContext, ChallengeSolver, RefusingSolver, CHALLENGE_MARKERS};
pub use form::{DetectedForm, FieldKind, FormField, FormSignature, FormStrategySet};
pub use mapping::{map_fields, ApplicantProfile, FieldPlan, FieldWrite};
pub use outcome::{AttemptOutcome, FailureReason, SkipReason};
