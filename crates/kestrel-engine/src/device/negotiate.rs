use super::caps::ApiVersion;
use super::error::{BackendError, ContextCreationError};

/// Picks the highest context version `attempt` accepts.
///
/// Candidates are probed in descending order regardless of how they were
/// listed; the first success wins and later candidates are not tried.
pub fn negotiate_version<F>(
    candidates: &[ApiVersion],
    mut attempt: F,
) -> Result<ApiVersion, ContextCreationError>
where
    F: FnMut(ApiVersion) -> Result<(), BackendError>,
{
    let mut ordered = candidates.to_vec();
    ordered.sort_unstable_by(|a, b| b.cmp(a));
    ordered.dedup();

    let mut tried = Vec::with_capacity(ordered.len());
    let mut last = None;

    for version in ordered {
        tried.push(version);
        match attempt(version) {
            Ok(()) => {
                log::debug!("context version {version} accepted");
                return Ok(version);
            }
            Err(e) => {
                log::debug!("context version {version} rejected: {e}");
                last = Some(e);
            }
        }
    }

    match last {
        Some(last) => Err(ContextCreationError::NoSupportedVersion { tried, last }),
        None => Err(ContextCreationError::NoCandidateVersions),
    }
}
