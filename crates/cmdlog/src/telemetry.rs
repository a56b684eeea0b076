//! Error telemetry seam
//!
//! Telemetry receives the error and a short breadcrumb describing where it
//! happened. Callers in this crate only ever pass breadcrumbs built from
//! counts, kinds and [`LogRecord::safe_summary`](crate::LogRecord::safe_summary),
//! never rendered records.

use std::error::Error;

/// External error-reporting collaborator
pub trait Telemetry: Send + Sync {
    fn report(&self, error: &(dyn Error + 'static), breadcrumb: &str);
}
