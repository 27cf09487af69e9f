//! Execution contexts: deferred-work frames living on the execution stack.
//!
//! A context stays on the stack until it reports `finished`; each interpreter
//! step against a context advances it by one iteration (stepping state lives
//! in the context, never in the shared procedure array).

use crate::object::{ArraySlice, Object, StringSlice};

#[derive(Debug, Clone)]
pub(crate) enum ExecutionContext {
    Procedure(ProcedureContext),
    For(ForLoopContext),
    Repeat(RepeatLoopContext),
    Loop(InfiniteLoopContext),
    ArrayForAll(ArrayForAllContext),
    DictionaryForAll(DictionaryForAllContext),
    StringForAll(StringForAllContext),
    KShow(KShowContext),
    /// Catch frame for `stop`; `exit` cannot cross it
    Stopped,
}

impl ExecutionContext {
    /// Loop contexts are the targets of `exit`
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            Self::For(..)
                | Self::Repeat(..)
                | Self::Loop(..)
                | Self::ArrayForAll(..)
                | Self::DictionaryForAll(..)
                | Self::StringForAll(..)
                | Self::KShow(..)
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ProcedureContext {
    pub body: ArraySlice,
    pub index: usize,
}

impl ProcedureContext {
    pub fn new(body: ArraySlice) -> Self {
        Self { body, index: 0 }
    }

    pub fn finished(&self) -> bool {
        self.index >= self.body.len
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ForLoopContext {
    pub proc: Object,
    pub control: f64,
    pub increment: f64,
    pub limit: f64,
    /// The control variable is pushed as an Integer iff initial, increment,
    /// and limit were all Integers
    pub integer: bool,
}

impl ForLoopContext {
    pub fn finished(&self) -> bool {
        if self.increment.is_sign_positive() {
            self.control > self.limit
        } else {
            self.control < self.limit
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RepeatLoopContext {
    pub proc: Object,
    pub remaining: i64,
}

impl RepeatLoopContext {
    pub fn finished(&self) -> bool {
        self.remaining <= 0
    }
}

/// Never finishes on its own; escaped via `exit` or `stop`
#[derive(Debug, Clone)]
pub(crate) struct InfiniteLoopContext {
    pub proc: Object,
}

#[derive(Debug, Clone)]
pub(crate) struct ArrayForAllContext {
    pub array: ArraySlice,
    pub proc: Object,
    pub index: usize,
}

impl ArrayForAllContext {
    pub fn finished(&self) -> bool {
        self.index >= self.array.len
    }
}

/// Entries are snapshotted when the context is created; mutating the
/// dictionary mid-iteration does not change what is enumerated
#[derive(Debug, Clone)]
pub(crate) struct DictionaryForAllContext {
    pub entries: Vec<(Object, Object)>,
    pub proc: Object,
    pub index: usize,
}

impl DictionaryForAllContext {
    pub fn finished(&self) -> bool {
        self.index >= self.entries.len()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StringForAllContext {
    pub string: StringSlice,
    pub proc: Object,
    pub index: usize,
}

impl StringForAllContext {
    pub fn finished(&self) -> bool {
        self.index >= self.string.len
    }
}

/// `kshow` interleaving: glyph, proc, glyph, proc, ..., glyph. The proc runs
/// between glyphs with the two surrounding character codes on the operand
/// stack
#[derive(Debug, Clone)]
pub(crate) struct KShowContext {
    pub string: StringSlice,
    pub proc: Object,
    /// Next glyph to render
    pub index: usize,
    /// True when the next step renders a glyph, false when it runs the proc
    pub pending_show: bool,
}

impl KShowContext {
    pub fn new(string: StringSlice, proc: Object) -> Self {
        Self {
            string,
            proc,
            index: 0,
            pending_show: true,
        }
    }

    pub fn finished(&self) -> bool {
        self.index >= self.string.len
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn for_loop_termination_follows_increment_sign() {
        let up = ForLoopContext {
            proc: Object::null(),
            control: 11.0,
            increment: 1.0,
            limit: 10.0,
            integer: true,
        };
        assert!(up.finished());

        let down = ForLoopContext {
            proc: Object::null(),
            control: 0.5,
            increment: -0.5,
            limit: 1.0,
            integer: false,
        };
        assert!(down.finished());

        let running = ForLoopContext {
            proc: Object::null(),
            control: 10.0,
            increment: 1.0,
            limit: 10.0,
            integer: true,
        };
        assert!(!running.finished());
    }

    #[test]
    fn repeat_counts_down() {
        let ctx = RepeatLoopContext {
            proc: Object::null(),
            remaining: 0,
        };
        assert!(ctx.finished());
    }
}
