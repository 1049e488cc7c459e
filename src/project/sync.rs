use tracing::debug;

use crate::foundation::error::PortraitResult;
use crate::project::model::{Project, RenderParameters, RenderState, StateKey};

/// Outcome of [`set_individual_flag`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndividualChange {
    /// The flag already had the requested value (or the state does not exist).
    Unchanged,
    /// The state stopped tracking defaults; its data was left as is.
    Detached,
    /// The state was reset to the current defaults and tracks them again.
    Rejoined,
    /// The caller declined the reset; flag and data are untouched.
    Declined,
}

/// Write `params` into the template and every non-individual state.
///
/// `source_ref` is never propagated; individual states are left untouched.
pub fn set_global_params(project: &mut Project, params: RenderParameters) -> PortraitResult<()> {
    params.validate()?;
    let mut touched = 0usize;
    for state in project.states.values_mut().filter(|s| !s.is_individual) {
        state.params = params.clone();
        touched += 1;
    }
    project.defaults = params;
    debug!(project = %project.id, touched, "propagated global parameters");
    Ok(())
}

/// Write `params` into one state only, independent of the template.
pub fn set_local_params(
    project: &mut Project,
    key: StateKey,
    params: RenderParameters,
) -> PortraitResult<()> {
    params.validate()?;
    project.state_mut(key).params = params;
    Ok(())
}

/// Route a UI edit of `key`: individual states take it locally, others update the template.
pub fn apply_edit(
    project: &mut Project,
    key: StateKey,
    params: RenderParameters,
) -> PortraitResult<()> {
    let individual = project.state(key).is_some_and(|s| s.is_individual);
    if individual {
        set_local_params(project, key, params)
    } else {
        set_global_params(project, params)?;
        // A sparse key edited while tracking must exist to render.
        project.state_mut(key);
        Ok(())
    }
}

/// Toggle whether `key` opts out of template propagation.
///
/// Turning the flag on only marks the state. Turning it off discards the individual tuning, so
/// `confirm` is consulted first with the state and the defaults it would be reset to; returning
/// `false` cancels the transition.
pub fn set_individual_flag<F>(
    project: &mut Project,
    key: StateKey,
    individual: bool,
    confirm: F,
) -> IndividualChange
where
    F: FnOnce(&RenderState, &RenderParameters) -> bool,
{
    if individual {
        let state = project.state_mut(key);
        if state.is_individual {
            return IndividualChange::Unchanged;
        }
        state.is_individual = true;
        debug!(state = %key, "state detached from defaults");
        return IndividualChange::Detached;
    }

    let Some(state) = project.states.get(&key) else {
        return IndividualChange::Unchanged;
    };
    if !state.is_individual {
        return IndividualChange::Unchanged;
    }
    if !confirm(state, &project.defaults) {
        return IndividualChange::Declined;
    }

    let defaults = project.defaults.clone();
    let state = project.state_mut(key);
    state.params = defaults;
    state.is_individual = false;
    debug!(state = %key, "state rejoined defaults");
    IndividualChange::Rejoined
}

#[cfg(test)]
#[path = "../../tests/unit/project/sync.rs"]
mod tests;
