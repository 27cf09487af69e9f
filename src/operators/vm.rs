//! Virtual-memory operators. Save objects are nominal sentinels: the
//! graphics state round-trips through the backend, but composite-object
//! contents are not snapshotted.

use crate::{
    error::{PostScriptError, PsResult},
    interpreter::Interpreter,
    object::{Object, Value},
};

pub(crate) fn save(interp: &mut Interpreter) -> PsResult<()> {
    interp.ctx.save();
    interp.gstate_stack.push(interp.gstate.clone());

    interp.push(Object::literal(Value::Save));

    Ok(())
}

pub(crate) fn restore(interp: &mut Interpreter) -> PsResult<()> {
    match interp.pop()?.value {
        Value::Save => {}
        _ => anyhow::bail!(PostScriptError::TypeCheck),
    }

    let state = interp
        .gstate_stack
        .pop()
        .ok_or(anyhow::anyhow!(PostScriptError::InvalidRestore))?;

    interp.gstate = state;
    interp.ctx.restore();

    Ok(())
}

/// Replaces executable operator names in the procedure (and procedures
/// nested within it) by the operators themselves, removing a lookup from
/// every later execution
pub(crate) fn bind(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;
    let Value::Array(slice) = obj.value else {
        anyhow::bail!(PostScriptError::TypeCheck);
    };

    interp.bind_procedure(slice)?;
    interp.push(obj);

    Ok(())
}
