//! Standard completion procedures.

use super::param_str;
use crate::complete::{Candidates, HelpText};
use crate::error::CommandError;
use crate::lexer::is_prefix_of;
use crate::registry::CompletionCall;
use sdnsh_diagnostics::codes;

/// Keys of the objects of the type in scope (or `objType` from params).
pub(crate) fn complete_object_key(
    call: &CompletionCall<'_>,
    out: &mut Candidates,
) -> Result<(), CommandError> {
    let obj_type = param_str(call.params, "objType")
        .or(call.obj_type)
        .ok_or_else(|| {
            CommandError::description(
                codes::INVALID_USE,
                "complete-object-key needs an object type",
            )
        })?;
    let help = HelpText::General(format!("{obj_type} name"));
    for key in call.store.keys(obj_type)? {
        if is_prefix_of(call.text, &key) {
            out.add(format!("{key} "), Some(help.clone()));
        }
    }
    Ok(())
}
