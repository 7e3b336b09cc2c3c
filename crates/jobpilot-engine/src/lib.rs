//! JobPilot orchestration engine.
//!
//! Ties the layers together: per-user policy evaluation and quota
//! arithmetic, multi-source discovery, candidate selection, and bounded
//! worker-pool dispatch of application attempts, with every state change
//! published through the event sink.
//!
//! The engine owns no user data. Profiles, policies, and credentials come
//! from the injected collaborator traits at the moment of use.

pub mod collaborators;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod policy;

pub use collaborators::{CredentialStore, PolicyProvider, ProfileProvider};
pub use dispatcher::{DispatchReport, DispatchTask, TaskDispatcher};
pub use engine::{CycleReport, Engine, EngineStatus};
pub use error::{EngineError, Result};
pub use events::{EngineEvent, NotificationSink, NullSink};
pub use policy::{day_start, permitted_attempts, AutomationPolicy};
