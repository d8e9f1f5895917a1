#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod export;
pub mod persist_scheduler;
pub mod persistence;
pub mod report;
pub mod study_store;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ExportError, PersistenceError, ReportError};
pub use persist_scheduler::{DEFAULT_QUIET_INTERVAL, PersistScheduler};
pub use persistence::{Loaded, PersistenceGateway, STATE_KEY, VERSION_KEY};
pub use report::{ReportDocument, ReportFormat, ReportStyle, paginate, render_report};
pub use study_store::{StateListener, StudyStore};
