//! Concrete source adapters for hosted job-board APIs.

pub mod greenhouse;
pub mod lever;

pub use greenhouse::GreenhouseAdapter;
pub use lever::LeverAdapter;
