//! Classification of upstream load failures.
//!
//! Structured [`UpstreamErrorKind`]s from the loader win. For `Other`, the
//! message and its cause chain are searched for two known signatures:
//! `"503"` (backend overloaded) and `"rate limit reached"` (actively
//! throttled). Substring matching is fragile: a message that merely mentions
//! 503 will be read as an overload. Loaders that can see a status code
//! should report the kind instead of relying on this.

use std::error::Error;

use crate::error::{ResolveError, UpstreamError, UpstreamErrorKind};

const OVERLOADED_SIGNATURE: &str = "503";
const RATE_LIMIT_SIGNATURE: &str = "rate limit reached";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signature {
    Overloaded,
    RateLimited,
}

pub fn classify(error: UpstreamError) -> ResolveError {
    let kind = match error.kind {
        UpstreamErrorKind::Other => match find_signature(&error) {
            Some(Signature::Overloaded) => UpstreamErrorKind::Overloaded,
            Some(Signature::RateLimited) => UpstreamErrorKind::RateLimited,
            None => UpstreamErrorKind::Other,
        },
        kind => kind,
    };

    match kind {
        UpstreamErrorKind::Overloaded => ResolveError::UpstreamOverloaded(error),
        UpstreamErrorKind::RateLimited => ResolveError::UpstreamThrottled(error),
        UpstreamErrorKind::Other => ResolveError::UpstreamRejected(error),
    }
}

fn find_signature(error: &UpstreamError) -> Option<Signature> {
    let mut current: Option<&(dyn Error + 'static)> = Some(error);
    while let Some(err) = current {
        let message = err.to_string();
        if message.contains(OVERLOADED_SIGNATURE) {
            return Some(Signature::Overloaded);
        }
        if message.to_lowercase().contains(RATE_LIMIT_SIGNATURE) {
            return Some(Signature::RateLimited);
        }
        current = err.source();
    }
    None
}
