pub use crate::config::{DEFAULT_DIGEST, DEFAULT_VERSION, Parameters, State};
pub use crate::desired::DesiredSpec;
pub use crate::diff::{Mismatch, first_mismatch, needs_regeneration};
pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::existing::ExistingCsrSnapshot;
pub use crate::reconcile::{ReconciliationResult, reconcile, regeneration_reason};
pub use crate::san::{SanEntry, SubjectAltNames};
pub use crate::subject::{FieldCode, SubjectAttributes};

mod config;
pub mod csr;
mod desired;
mod diff;
mod digest;
mod errors;
mod existing;
mod key;
mod reconcile;
mod san;
mod subject;

pub extern crate rcgen;

#[cfg(test)]
static INIT: std::sync::Once = std::sync::Once::new();
