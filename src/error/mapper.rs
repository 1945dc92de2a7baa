//! Maps raised transport-level failures into semantic error kinds.
//!
//! Provider adapters surface failures however their HTTP stack raises them,
//! often wrapped several layers deep. The mapper unwraps to the root cause
//! and translates status codes and connection failures into the typed
//! variants of [`TurnstileError`], so callers never see a bare transport
//! error.

use std::error::Error;
use std::io;

use super::TurnstileError;

/// Upper bound on the cause walk, in case a chain is cyclic without being
/// directly self-referential.
const MAX_CAUSE_DEPTH: usize = 32;

/// Walk `source()` links to the root cause.
///
/// A self-referential link terminates the walk.
pub fn root_cause<'a>(err: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    let mut current = err;
    let mut depth = 0;
    while let Some(next) = current.source() {
        let same = (next as *const dyn Error).cast::<()>()
            == (current as *const dyn Error).cast::<()>();
        if same || depth >= MAX_CAUSE_DEPTH {
            break;
        }
        current = next;
        depth += 1;
    }
    current
}

/// Map an HTTP status to a semantic error kind.
pub fn map_status(status: u16, message: impl Into<String>) -> TurnstileError {
    let message = message.into();
    match status {
        401 | 403 => TurnstileError::Authentication(message),
        404 => TurnstileError::ModelNotFound(message),
        408 => TurnstileError::Timeout(message),
        429 => TurnstileError::RateLimited(message),
        500..=599 => TurnstileError::InternalServer { status, message },
        _ => TurnstileError::InvalidRequest(message),
    }
}

/// Map an already-typed failure, resolving transport carriers into
/// semantic kinds and passing everything else through unchanged.
pub fn map_failure(err: TurnstileError) -> TurnstileError {
    match err {
        TurnstileError::Api {
            status, message, ..
        } => map_status(status, message),
        TurnstileError::Network(e) => map_reqwest(&e),
        TurnstileError::Io(e) => map_io(&e),
        other => other,
    }
}

/// Map an arbitrary boxed failure by unwrapping to its root cause.
///
/// An already-typed [`TurnstileError`] at the top level passes through
/// (after resolving transport carriers); a typed error buried deeper in
/// the chain is mapped from its recognizable parts.
pub fn map_boxed(err: Box<dyn Error + Send + Sync>) -> TurnstileError {
    let err = match err.downcast::<TurnstileError>() {
        Ok(typed) => return map_failure(*typed),
        Err(other) => other,
    };

    let root = root_cause(err.as_ref());
    if let Some(e) = root.downcast_ref::<reqwest::Error>() {
        return map_reqwest(e);
    }
    if let Some(e) = root.downcast_ref::<io::Error>() {
        return map_io(e);
    }
    if let Some(e) = root.downcast_ref::<TurnstileError>() {
        if let Some(mapped) = remap_by_ref(e) {
            return mapped;
        }
    }
    TurnstileError::Internal(err.to_string())
}

fn map_reqwest(err: &reqwest::Error) -> TurnstileError {
    if let Some(status) = err.status() {
        return map_status(status.as_u16(), err.to_string());
    }
    if err.is_connect() {
        return TurnstileError::ModelUnreachable(err.to_string());
    }
    if err.is_timeout() {
        return TurnstileError::Timeout(err.to_string());
    }
    TurnstileError::Internal(err.to_string())
}

fn map_io(err: &io::Error) -> TurnstileError {
    match err.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable => TurnstileError::ModelUnreachable(err.to_string()),
        io::ErrorKind::TimedOut => TurnstileError::Timeout(err.to_string()),
        _ => TurnstileError::Internal(err.to_string()),
    }
}

/// Re-map a typed error reached through a borrow (it cannot be moved out
/// of the cause chain). Transport carriers are resolved; semantic kinds
/// are rebuilt with their message intact.
fn remap_by_ref(err: &TurnstileError) -> Option<TurnstileError> {
    let mapped = match err {
        TurnstileError::Api {
            status, message, ..
        } => map_status(*status, message.clone()),
        TurnstileError::Network(e) => map_reqwest(e),
        TurnstileError::Io(e) => map_io(e),
        TurnstileError::Authentication(m) => TurnstileError::Authentication(m.clone()),
        TurnstileError::RateLimited(m) => TurnstileError::RateLimited(m.clone()),
        TurnstileError::Timeout(m) => TurnstileError::Timeout(m.clone()),
        TurnstileError::ModelNotFound(m) => TurnstileError::ModelNotFound(m.clone()),
        TurnstileError::InvalidRequest(m) => TurnstileError::InvalidRequest(m.clone()),
        TurnstileError::InternalServer { status, message } => TurnstileError::InternalServer {
            status: *status,
            message: message.clone(),
        },
        TurnstileError::ModelUnreachable(m) => TurnstileError::ModelUnreachable(m.clone()),
        _ => return None,
    };
    Some(mapped)
}
