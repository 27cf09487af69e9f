use std::fmt;

use crate::{lexer::Span, object::Name};

pub type PsResult<T> = anyhow::Result<T>;

/*
postscript spec page 523

configurationerror setpagedevice or setdevparams request cannot be satisfied
dictfull No more room in dictionary
dictstackoverflow Too many begin operators
dictstackunderflow Too many end operators
execstackoverflow Executive stack nesting too deep
handleerror Called to report error information
interrupt External interrupt request (for example, Control-C)
invalidaccess Attempt to violate access attribute
invalidexit exit not in loop
invalidfileaccess Unacceptable access string
invalidfont Invalid Font resource name or font or CIDFont dictionary
invalidrestore Improper restore
ioerror Input/output error
limitcheck Implementation limit exceeded
nocurrentpoint Current point undefined
rangecheck Operand out of bounds
stackoverflow Operand stack overflow
stackunderflow Operand stack underflow
syntaxerror PostScript language syntax error
timeout Time limit exceeded
typecheck Operand of wrong type
undefined Name not known
undefinedfilename File not found
undefinedresource Resource instance not found
undefinedresult Overflow, underflow, or meaningless result
unmatchedmark Expected mark not on stack
unregistered Internal error
VMerror Virtual memory exhausted
*/

#[derive(Debug, Clone, PartialEq)]
pub enum PostScriptError {
    /// setpagedevice or setdevparams request cannot be satisfied
    ConfigurationError,

    /// No more room in dictionary
    DictFull,

    /// Too many begin operators
    DictStackOverflow,

    /// Too many end operators
    DictStackUnderflow,

    /// Executive stack nesting too deep
    ExecStackOverflow,

    /// External interrupt request
    Interrupt,

    /// Attempt to violate access attribute
    InvalidAccess,

    /// exit not in loop
    InvalidExit,

    /// Unacceptable access string
    InvalidFileAccess,

    /// Invalid Font resource name or font dictionary
    InvalidFont,

    /// Improper restore
    InvalidRestore,

    /// Input/output error
    IoError,

    /// Implementation limit exceeded
    LimitCheck,

    /// Current point undefined
    NoCurrentPoint,

    /// Operand out of bounds
    RangeCheck,

    /// Operand stack overflow
    StackOverflow,

    /// Operand stack underflow
    StackUnderflow,

    /// PostScript language syntax error. Carries the source span of the
    /// offending token when one is known
    SyntaxError { span: Option<Span> },

    /// Time limit exceeded (the interpreter's step budget ran out)
    Timeout,

    /// Operand of wrong type
    TypeCheck,

    /// Name not known
    Undefined { name: Name },

    /// File not found
    UndefinedFileName,

    /// Resource instance not found
    UndefinedResource,

    /// Overflow, underflow, or meaningless result
    UndefinedResult,

    /// Expected mark not on stack
    UnmatchedMark,

    /// Internal error
    Unregistered,

    /// Virtual memory exhausted
    VmError,
}

impl PostScriptError {
    /// The PLRM error name, as reported through `$error` and `errordict`
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConfigurationError => "configurationerror",
            Self::DictFull => "dictfull",
            Self::DictStackOverflow => "dictstackoverflow",
            Self::DictStackUnderflow => "dictstackunderflow",
            Self::ExecStackOverflow => "execstackoverflow",
            Self::Interrupt => "interrupt",
            Self::InvalidAccess => "invalidaccess",
            Self::InvalidExit => "invalidexit",
            Self::InvalidFileAccess => "invalidfileaccess",
            Self::InvalidFont => "invalidfont",
            Self::InvalidRestore => "invalidrestore",
            Self::IoError => "ioerror",
            Self::LimitCheck => "limitcheck",
            Self::NoCurrentPoint => "nocurrentpoint",
            Self::RangeCheck => "rangecheck",
            Self::StackOverflow => "stackoverflow",
            Self::StackUnderflow => "stackunderflow",
            Self::SyntaxError { .. } => "syntaxerror",
            Self::Timeout => "timeout",
            Self::TypeCheck => "typecheck",
            Self::Undefined { .. } => "undefined",
            Self::UndefinedFileName => "undefinedfilename",
            Self::UndefinedResource => "undefinedresource",
            Self::UndefinedResult => "undefinedresult",
            Self::UnmatchedMark => "unmatchedmark",
            Self::Unregistered => "unregistered",
            Self::VmError => "VMerror",
        }
    }
}

impl fmt::Display for PostScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined { name } => write!(f, "undefined: {:?}", name),
            Self::SyntaxError { span: Some(span) } => {
                write!(f, "syntaxerror at {}..{}", span.from, span.to)
            }
            _ => f.write_str(self.name()),
        }
    }
}

impl std::error::Error for PostScriptError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_names_match_plrm() {
        assert_eq!(PostScriptError::DictFull.name(), "dictfull");
        assert_eq!(PostScriptError::VmError.name(), "VMerror");
        assert_eq!(
            PostScriptError::Undefined {
                name: Name::from_bytes(b"foo".to_vec())
            }
            .name(),
            "undefined"
        );
    }
}
