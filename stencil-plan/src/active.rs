//! Active version resolution.
//!
//! Runs after [`reconcile`](crate::reconcile::reconcile): whether an inactive
//! entry is "the old active version, switched off" or "an unrelated new
//! version" depends on the identities resolved there.

use crate::error::AmbiguityError;
use crate::reconcile::ReconciliationResult;

/// Return the index of the single active entry.
///
/// `creating` is true when no checkpoint exists for the template yet.
/// Never picks a version on the caller's behalf: zero or several active
/// entries are errors, with the most specific diagnostic available.
pub fn resolve_active(
    result: &ReconciliationResult,
    creating: bool,
) -> Result<usize, AmbiguityError> {
    let active: Vec<usize> = result
        .versions
        .iter()
        .enumerate()
        .filter(|(_, v)| v.definition.active)
        .map(|(i, _)| i)
        .collect();

    match active.as_slice() {
        [index] => Ok(*index),
        [] if creating => Err(AmbiguityError::NoneActiveOnCreate),
        [] => {
            let deactivated = result
                .versions
                .iter()
                .enumerate()
                .find(|(_, v)| v.previous.as_ref().is_some_and(|p| p.active));
            match deactivated {
                Some((index, version)) => Err(AmbiguityError::Undetermined {
                    deactivated: version.label(index),
                }),
                None => Err(AmbiguityError::NoneActive),
            }
        }
        many => Err(AmbiguityError::MultipleActive {
            versions: many
                .iter()
                .map(|&i| result.versions[i].label(i))
                .collect(),
        }),
    }
}
