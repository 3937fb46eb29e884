use crate::config::{Parameters, State};
use crate::csr::generate;
use crate::desired::DesiredSpec;
use crate::diff::{Mismatch, first_mismatch};
use crate::errors::{ErrorKind, Result};
use crate::existing::ExistingCsrSnapshot;
use crate::subject::SubjectAttributes;
use serde::Serialize;
use std::fs::Permissions;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

/// The declared outcome of a run. Subject and alternative names always
/// describe the desired state, even when nothing was written.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    pub path: PathBuf,
    pub subject: SubjectAttributes,
    #[serde(rename = "subjectAltName")]
    pub subject_alt_name: String,
    pub changed: bool,
}

/// Brings the request file at `parameters.path` to the declared state.
#[cfg_attr(feature = "tracing", tracing::instrument(
    name = "reconcile",
    skip(parameters),
    fields(path = %parameters.path.display(), state = ?parameters.state, check_mode = parameters.check_mode),
    level = tracing::Level::INFO,
    err(level = tracing::Level::WARN)
))]
pub fn reconcile(parameters: &Parameters) -> Result<ReconciliationResult> {
    let desired = DesiredSpec::try_from(parameters)?;
    let path = parameters.path.as_path();
    check_directory(path)?;
    let changed = match parameters.state {
        State::Present => ensure_present(path, &desired, parameters.check_mode)?,
        State::Absent => ensure_absent(path, parameters.check_mode)?,
    };
    Ok(ReconciliationResult {
        path: path.to_path_buf(),
        subject: desired.subject.clone(),
        subject_alt_name: desired.subject_alt_names.joined(),
        changed,
    })
}

fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|it| !it.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

fn check_directory(path: &Path) -> Result<()> {
    let dir = parent_dir(path);
    if dir.is_dir() {
        Ok(())
    } else {
        Err(ErrorKind::Directory {
            path: dir.to_path_buf(),
        }
        .into())
    }
}

/// Decides whether the request at `path` has to be (re)generated.
pub fn regeneration_reason(path: &Path, desired: &DesiredSpec) -> Result<Option<Mismatch>> {
    if desired.force {
        return Ok(Some(Mismatch::Forced));
    }
    let existing = ExistingCsrSnapshot::read(path)?;
    Ok(first_mismatch(desired, existing.as_ref()))
}

fn ensure_present(path: &Path, desired: &DesiredSpec, check_mode: bool) -> Result<bool> {
    let Some(reason) = regeneration_reason(path, desired)? else {
        #[cfg(feature = "tracing")]
        tracing::debug!("request is up to date");
        return Ok(false);
    };
    #[cfg(feature = "tracing")]
    tracing::info!(%reason, check_mode, "request needs regeneration");
    if !check_mode {
        let pem = generate(desired)?;
        write_request(path, &pem)?;
    }
    Ok(true)
}

fn ensure_absent(path: &Path, check_mode: bool) -> Result<bool> {
    let removal_error = |msg: String| {
        ErrorKind::Removal {
            path: path.to_path_buf(),
        }
        .with_msg(msg)
    };
    if check_mode {
        // same outcome as remove_file, which never follows the link
        return match std::fs::symlink_metadata(path) {
            Ok(metadata) if metadata.is_dir() => Err(removal_error("is a directory".to_string())),
            Ok(_) => Ok(true),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(false),
            Err(err) => Err(removal_error(err.to_string())),
        };
    }
    match std::fs::remove_file(path) {
        Ok(()) => {
            #[cfg(feature = "tracing")]
            tracing::info!("request removed");
            Ok(true)
        }
        Err(err) if err.kind() == IoErrorKind::NotFound => Ok(false),
        Err(err) => Err(removal_error(err.to_string())),
    }
}

/// Replaces `path` with `pem` through a temporary file renamed into place.
/// An existing file keeps its permissions.
fn write_request(path: &Path, pem: &str) -> Result<()> {
    let write_error = |err: std::io::Error| {
        ErrorKind::Write {
            path: path.to_path_buf(),
        }
        .with_msg(err.to_string())
    };
    let permissions = std::fs::metadata(path)
        .map(|it| it.permissions())
        .ok()
        .or_else(default_permissions);
    let mut file = tempfile::NamedTempFile::new_in(parent_dir(path)).map_err(write_error)?;
    file.write_all(pem.as_bytes()).map_err(write_error)?;
    if let Some(permissions) = permissions {
        file.as_file().set_permissions(permissions).map_err(write_error)?;
    }
    file.as_file().sync_all().map_err(write_error)?;
    file.persist(path).map_err(|err| write_error(err.error))?;
    Ok(())
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}
