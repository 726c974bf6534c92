#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod flow;
pub mod runtime;
pub mod store;
pub mod transport;

pub use e4l_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, FlowError, TransportError};
pub use flow::QuestionnaireFlow;
pub use runtime::{EventQueue, SessionRuntime};
pub use store::SessionStore;
pub use transport::{ApiConfig, HttpTransport, QuestionnaireTransport};
