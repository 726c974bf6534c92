#![forbid(unsafe_code)]

pub mod eligibility;
pub mod error;
pub mod event;
pub mod model;
pub mod reducer;
pub mod state;
pub mod time;

pub use eligibility::{EligibilityReport, can_advance};
pub use error::{ComputationError, SeminarValidationError, SubmissionError, ValueLimitBreach};
pub use event::SessionEvent;
pub use reducer::reduce;
pub use state::SessionState;
pub use time::Clock;
