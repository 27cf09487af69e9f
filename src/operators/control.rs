//! Control operators: deferred execution and the loop family. Loops are
//! reified as execution contexts rather than run re-entrantly, so `exit` and
//! `stop` can splice frames off the execution stack.

use crate::{
    context::{
        ExecutionContext, ForLoopContext, InfiniteLoopContext, RepeatLoopContext,
    },
    error::{PostScriptError, PsResult},
    interpreter::{ExecutionItem, Interpreter},
    object::{Object, Value},
};

pub(crate) fn exec(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    if obj.is_procedure() {
        return interp.push_procedure(obj);
    }

    interp.handle_object(obj)
}

pub(crate) fn if_op(interp: &mut Interpreter) -> PsResult<()> {
    let proc = interp.pop_procedure()?;
    let condition = interp.pop_bool()?;

    if condition {
        interp.push_procedure(proc)?;
    }

    Ok(())
}

pub(crate) fn ifelse(interp: &mut Interpreter) -> PsResult<()> {
    let alternative = interp.pop_procedure()?;
    let consequent = interp.pop_procedure()?;
    let condition = interp.pop_bool()?;

    interp.push_procedure(if condition { consequent } else { alternative })
}

/// `initial increment limit proc for`. The control variable stays an integer
/// only when all three bounds are integers
pub(crate) fn for_op(interp: &mut Interpreter) -> PsResult<()> {
    let proc = interp.pop_procedure()?;
    let limit = interp.pop()?;
    let increment = interp.pop()?;
    let initial = interp.pop()?;

    let integer = [&initial, &increment, &limit]
        .iter()
        .all(|obj| matches!(obj.value, Value::Integer(..)));

    let as_f64 = |obj: &Object| -> PsResult<f64> {
        match obj.value {
            Value::Integer(n) => Ok(n as f64),
            Value::Real(r) => Ok(r),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    };

    interp.push_execution_item(ExecutionItem::Context(ExecutionContext::For(
        ForLoopContext {
            proc,
            control: as_f64(&initial)?,
            increment: as_f64(&increment)?,
            limit: as_f64(&limit)?,
            integer,
        },
    )))
}

pub(crate) fn repeat(interp: &mut Interpreter) -> PsResult<()> {
    let proc = interp.pop_procedure()?;
    let n = interp.pop_int()?;

    if n < 0 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    interp.push_execution_item(ExecutionItem::Context(ExecutionContext::Repeat(
        RepeatLoopContext { proc, remaining: n },
    )))
}

pub(crate) fn loop_op(interp: &mut Interpreter) -> PsResult<()> {
    let proc = interp.pop_procedure()?;

    interp.push_execution_item(ExecutionItem::Context(ExecutionContext::Loop(
        InfiniteLoopContext { proc },
    )))
}

pub(crate) fn exit(interp: &mut Interpreter) -> PsResult<()> {
    interp.unwind_to_loop()
}

pub(crate) fn stop(interp: &mut Interpreter) -> PsResult<()> {
    interp.stop();

    Ok(())
}

/// Runs the operand under a catch frame; the frame reports `true` when a
/// `stop` (or raised error) unwound to it, `false` on normal completion
pub(crate) fn stopped(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    interp.push_execution_item(ExecutionItem::Context(ExecutionContext::Stopped))?;

    if obj.is_procedure() {
        interp.push_procedure(obj)
    } else {
        interp.handle_object(obj)
    }
}

pub(crate) fn countexecstack(interp: &mut Interpreter) -> PsResult<()> {
    let depth = interp.execution_stack.len();

    interp.push(Object::integer(depth as i64));

    Ok(())
}

pub(crate) fn quit(interp: &mut Interpreter) -> PsResult<()> {
    interp.request_quit();

    Ok(())
}
