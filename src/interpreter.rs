//! The fetch–decode–execute loop and the interpreter's stacks.
//!
//! Execution state lives on three stacks: operands, dictionaries, and an
//! execution stack that interleaves plain objects with deferred-work
//! contexts. File and string token sources on the execution stack are
//! re-scanned lazily, one object per step.

use std::collections::HashMap;

use anyhow::anyhow;
use rand::{rngs::SmallRng, SeedableRng};

use crate::{
    builtin,
    context::{ExecutionContext, ProcedureContext},
    error::{PostScriptError, PsResult},
    file::{FileSystem, PsFile},
    font::true_type::TrueTypeFontFile,
    graphics::GraphicsContext,
    object::{
        Access, ArrayIndex, ArraySlice, Container, DictKey, DictionaryIndex, FileIndex, Name,
        Object, PsArray, PsDictionary, PsString, StringIndex, StringSlice, Value,
    },
    scanner::{self, BoundingBox, DocumentMetadata},
};

/// Step budget for a whole run; exceeding it raises `timeout`
pub const MAX_STEPS: usize = 100_000;
pub const MAX_EXECUTION_STACK_SIZE: usize = 250;
pub const MAX_OPERAND_STACK_SIZE: usize = 500;
pub const MAX_DICT_STACK_SIZE: usize = 20;
pub const MAX_DICT_CAPACITY: usize = 1024;

/// Deterministic seed for the `rand` operator
const RNG_SEED: u64 = 0x5F0F_3CF5;

#[derive(Debug, Clone)]
pub(crate) enum ExecutionItem {
    Object(Object),
    Context(ExecutionContext),
}

/// Interpreter-side graphics state: the pieces of PostScript graphics state
/// the backend does not own
#[derive(Debug, Clone, Default)]
pub(crate) struct InterpreterGraphicsState {
    pub font: Option<Object>,
}

pub struct Interpreter<'a> {
    // Composite objects are stored behind indices so that copying an object
    // copies the handle, not the content
    pub(crate) arrays: Container<ArrayIndex, PsArray>,
    pub(crate) strings: Container<StringIndex, PsString>,
    pub(crate) dictionaries: Container<DictionaryIndex, PsDictionary>,
    pub(crate) files: Container<FileIndex, PsFile>,

    pub(crate) operand_stack: Vec<Object>,
    pub(crate) dictionary_stack: Vec<DictionaryIndex>,
    pub(crate) execution_stack: Vec<ExecutionItem>,

    pub(crate) file_system: FileSystem,
    pub(crate) fonts: HashMap<i64, TrueTypeFontFile>,
    pub(crate) next_font_id: i64,

    pub(crate) gstate: InterpreterGraphicsState,
    pub(crate) gstate_stack: Vec<InterpreterGraphicsState>,

    pub(crate) ctx: &'a mut dyn GraphicsContext,
    pub(crate) rng: SmallRng,

    pub(crate) system_dict: DictionaryIndex,
    pub(crate) user_dict: DictionaryIndex,
    pub(crate) font_directory: DictionaryIndex,
    pub(crate) error_info: DictionaryIndex,

    stdout_file: FileIndex,
    source: Vec<u8>,
    metadata: DocumentMetadata,

    steps: usize,
    step_limit: usize,
    quit: bool,
}

impl<'a> Interpreter<'a> {
    pub fn new(source: &[u8], ctx: &'a mut dyn GraphicsContext) -> Self {
        let mut arrays = Container::new();
        let strings = Container::new();
        let mut dictionaries = Container::new();
        let mut files = Container::new();

        let system_dict = dictionaries.insert(PsDictionary::new(MAX_DICT_CAPACITY));
        let global_dict = dictionaries.insert(PsDictionary::new(240));
        let user_dict = dictionaries.insert(PsDictionary::new(240));
        let font_directory = dictionaries.insert(PsDictionary::new(100));
        let error_info = dictionaries.insert(PsDictionary::new(8));
        let error_dict = dictionaries.insert(PsDictionary::new(40));

        let standard_encoding = arrays.insert(builtin::standard_encoding_array());
        let encoding_len = arrays.get(&standard_encoding).unwrap().len();

        {
            let system = dictionaries.get_mut(&system_dict).unwrap();

            builtin::install_operators(system);

            let named_dicts = [
                ("systemdict", system_dict),
                ("globaldict", global_dict),
                ("userdict", user_dict),
                ("FontDirectory", font_directory),
                ("$error", error_info),
                ("errordict", error_dict),
            ];

            for (name, dict) in named_dicts {
                system.force_insert(
                    DictKey::Name(Name::new(name)),
                    Object::literal(Value::Dictionary(dict)),
                );
            }

            system.force_insert(
                DictKey::Name(Name::new("StandardEncoding")),
                Object::literal(Value::Array(ArraySlice {
                    index: standard_encoding,
                    start: 0,
                    len: encoding_len,
                })),
            );

            system.set_access(Access::ReadOnly);
        }

        let stdout_file = files.insert(PsFile::capture(
            "%stdout",
            crate::file::AccessMode::Write,
        ));

        Self {
            arrays,
            strings,
            dictionaries,
            files,
            operand_stack: Vec::new(),
            dictionary_stack: vec![system_dict, global_dict, user_dict],
            execution_stack: Vec::new(),
            file_system: FileSystem::with_standard_library(),
            fonts: HashMap::new(),
            next_font_id: 1,
            gstate: InterpreterGraphicsState::default(),
            gstate_stack: Vec::new(),
            ctx,
            rng: SmallRng::seed_from_u64(RNG_SEED),
            system_dict,
            user_dict,
            font_directory,
            error_info,
            stdout_file,
            metadata: scanner::scan_document_metadata(source),
            source: source.to_vec(),
            steps: 0,
            step_limit: MAX_STEPS,
            quit: false,
        }
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    /// The `%%BoundingBox` captured by the DSC pre-scan, for canvas sizing
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.metadata.bounding_box
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    /// Everything the program wrote to `%stdout`
    pub fn stdout(&self) -> &[u8] {
        self.files
            .get(&self.stdout_file)
            .map(PsFile::captured)
            .unwrap_or_default()
    }

    /// Executes the standard library followed by the program, until
    /// completion, step exhaustion, `quit`, or an uncaught error
    pub fn run(&mut self) -> PsResult<()> {
        self.execution_stack.clear();
        self.quit = false;

        self.push_source_file("%program", self.source.clone());
        for name in ["error.ps", "misc.ps", "init.ps"] {
            let contents = self.file_system.get_file(name)?.to_vec();
            self.push_source_file(name, contents);
        }

        loop {
            if self.quit {
                break;
            }

            match self.step() {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => self.recover_or_bail(err)?,
            }
        }

        Ok(())
    }

    fn push_source_file(&mut self, name: &str, contents: Vec<u8>) {
        let file = self.files.insert(PsFile::memory(name, contents));
        self.execution_stack
            .push(ExecutionItem::Object(Object::executable(Value::File(file))));
    }

    /// One turn of the fetch–decode–execute loop. `Ok(false)` means the
    /// execution stack is exhausted
    fn step(&mut self) -> PsResult<bool> {
        self.steps += 1;
        if self.steps > self.step_limit {
            anyhow::bail!(PostScriptError::Timeout);
        }

        if self.operand_stack.len() > MAX_OPERAND_STACK_SIZE {
            anyhow::bail!(PostScriptError::StackOverflow);
        }

        // retire finished contexts before fetching
        loop {
            match self.execution_stack.last() {
                None => return Ok(false),
                Some(ExecutionItem::Context(ctx)) if context_finished(ctx) => {
                    self.exit_top_context();
                }
                _ => break,
            }
        }

        match self.execution_stack.last() {
            Some(ExecutionItem::Context(..)) => self.step_context()?,
            Some(ExecutionItem::Object(obj)) if is_token_source(obj) => {
                let Value::File(file) = &obj.value else {
                    unreachable!("token sources are files");
                };
                let file = *file;

                match self.read_object_from_file(file)? {
                    Some(next) => self.handle_object(next)?,
                    // EOF pops the exhausted file
                    None => {
                        self.execution_stack.pop();
                    }
                }
            }
            Some(ExecutionItem::Object(obj)) if is_string_source(obj) => {
                let Value::String(slice) = &obj.value else {
                    unreachable!("string sources are strings");
                };
                let slice = *slice;

                // an executable string becomes a token source in place
                let bytes = self.string_bytes_for_execution(slice)?;
                let file = self.files.insert(PsFile::memory("%string", bytes));
                *self.execution_stack.last_mut().unwrap() =
                    ExecutionItem::Object(Object::executable(Value::File(file)));
            }
            Some(ExecutionItem::Object(..)) => {
                let Some(ExecutionItem::Object(obj)) = self.execution_stack.pop() else {
                    unreachable!();
                };

                self.handle_object(obj)?;
            }
            None => return Ok(false),
        }

        Ok(true)
    }

    /// Decode one fetched object: literals and procedure bodies push
    /// themselves, executable names resolve through the dictionary stack
    pub(crate) fn handle_object(&mut self, obj: Object) -> PsResult<()> {
        if !obj.executable || obj.is_procedure() {
            self.push(obj);
            return Ok(());
        }

        match &obj.value {
            Value::Name(name) => {
                let resolved = self.symbol_lookup(&name.clone())?;
                self.execute_resolved(resolved)
            }
            Value::Operator(op) => builtin::invoke(self, *op),
            // handled by the fetch loop once they reach the stack top
            Value::File(..) | Value::String(..) => {
                self.push_execution_item(ExecutionItem::Object(obj))
            }
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    /// What to do with the value an executable name resolved to
    pub(crate) fn execute_resolved(&mut self, obj: Object) -> PsResult<()> {
        match &obj.value {
            Value::Operator(op) if obj.executable => builtin::invoke(self, *op),
            Value::Array(slice) if obj.executable => {
                self.push_execution_item(ExecutionItem::Context(ExecutionContext::Procedure(
                    ProcedureContext::new(*slice),
                )))
            }
            Value::Name(..) | Value::File(..) | Value::String(..) if obj.executable => {
                self.push_execution_item(ExecutionItem::Object(obj))
            }
            _ => {
                self.push(obj);
                Ok(())
            }
        }
    }

    /// Advance the (unfinished) context on top of the execution stack by one
    /// iteration
    fn step_context(&mut self) -> PsResult<()> {
        let top = self.execution_stack.len() - 1;
        let ExecutionItem::Context(ctx) = &mut self.execution_stack[top] else {
            unreachable!("caller checked the top is a context");
        };

        match ctx {
            ExecutionContext::Procedure(proc) => {
                let body = proc.body;
                let index = proc.index;
                proc.index += 1;

                // procedure bodies execute regardless of access attributes
                let element = self.array_get_unchecked(body, index)?;
                self.push_execution_item(ExecutionItem::Object(element))
            }
            ExecutionContext::For(ctx) => {
                let control = ctx.control;
                let integer = ctx.integer;
                let proc = ctx.proc.clone();
                ctx.control += ctx.increment;

                if integer {
                    self.push(Object::integer(control as i64));
                } else {
                    self.push(Object::real(control));
                }

                self.push_procedure(proc)
            }
            ExecutionContext::Repeat(ctx) => {
                ctx.remaining -= 1;
                let proc = ctx.proc.clone();

                self.push_procedure(proc)
            }
            ExecutionContext::Loop(ctx) => {
                let proc = ctx.proc.clone();

                self.push_procedure(proc)
            }
            ExecutionContext::ArrayForAll(ctx) => {
                let array = ctx.array;
                let index = ctx.index;
                let proc = ctx.proc.clone();
                ctx.index += 1;

                let element = self.array_get(array, index)?;
                self.push(element);
                self.push_procedure(proc)
            }
            ExecutionContext::DictionaryForAll(ctx) => {
                let (key, value) = ctx.entries[ctx.index].clone();
                let proc = ctx.proc.clone();
                ctx.index += 1;

                self.push(key);
                self.push(value);
                self.push_procedure(proc)
            }
            ExecutionContext::StringForAll(ctx) => {
                let string = ctx.string;
                let index = ctx.index;
                let proc = ctx.proc.clone();
                ctx.index += 1;

                let byte = self.string_get(string, index)?;
                self.push(Object::integer(i64::from(byte)));
                self.push_procedure(proc)
            }
            ExecutionContext::KShow(ctx) => {
                if ctx.pending_show {
                    let string = ctx.string;
                    let index = ctx.index;
                    ctx.index += 1;
                    ctx.pending_show = false;

                    let byte = self.string_get(string, index)?;
                    crate::operators::font_ops::show_bytes(self, &[byte])
                } else {
                    let string = ctx.string;
                    let index = ctx.index;
                    let proc = ctx.proc.clone();
                    ctx.pending_show = true;

                    let previous = self.string_get(string, index - 1)?;
                    let next = self.string_get(string, index)?;
                    self.push(Object::integer(i64::from(previous)));
                    self.push(Object::integer(i64::from(next)));
                    self.push_procedure(proc)
                }
            }
            // a stopped frame has no work of its own; it is always finished
            ExecutionContext::Stopped => unreachable!("stopped frames never step"),
        }
    }

    /// Pops the finished frame; a normally completed `stopped` frame reports
    /// that no stop occurred
    fn exit_top_context(&mut self) {
        if let Some(ExecutionItem::Context(ExecutionContext::Stopped)) = self.execution_stack.pop()
        {
            self.push(Object::boolean(false));
        }
    }

    /// Pushes a fresh procedure context for `proc`; the array itself is
    /// shared and never mutated by iteration
    pub(crate) fn push_procedure(&mut self, proc: Object) -> PsResult<()> {
        let Value::Array(slice) = proc.value else {
            anyhow::bail!(PostScriptError::TypeCheck);
        };

        self.push_execution_item(ExecutionItem::Context(ExecutionContext::Procedure(
            ProcedureContext::new(slice),
        )))
    }

    pub(crate) fn push_execution_item(&mut self, item: ExecutionItem) -> PsResult<()> {
        if self.execution_stack.len() >= MAX_EXECUTION_STACK_SIZE {
            anyhow::bail!(PostScriptError::ExecStackOverflow);
        }

        self.execution_stack.push(item);

        Ok(())
    }

    /// Unwinds to the nearest `stopped` frame after a raised error, recording
    /// the error name into `$error`. Uncatchable situations propagate
    fn recover_or_bail(&mut self, err: anyhow::Error) -> PsResult<()> {
        let Some(ps_err) = err.downcast_ref::<PostScriptError>() else {
            return Err(err);
        };

        log::debug!("recovering from {}", ps_err);
        self.record_error(ps_err);

        if self.unwind_to_stopped() {
            self.push(Object::boolean(true));
            Ok(())
        } else {
            Err(err)
        }
    }

    fn record_error(&mut self, err: &PostScriptError) {
        let info = self
            .dictionaries
            .get_mut(&self.error_info)
            .expect("$error exists");

        info.force_insert(DictKey::Name(Name::new("newerror")), Object::boolean(true));
        info.force_insert(
            DictKey::Name(Name::new("errorname")),
            Object::literal_name(Name::new(err.name())),
        );
    }

    /// Truncates the execution stack through the nearest `stopped` frame.
    /// Returns false when no such frame exists
    pub(crate) fn unwind_to_stopped(&mut self) -> bool {
        let target = self.execution_stack.iter().rposition(|item| {
            matches!(
                item,
                ExecutionItem::Context(ExecutionContext::Stopped)
            )
        });

        match target {
            Some(index) => {
                self.execution_stack.truncate(index);
                true
            }
            None => false,
        }
    }

    /// `exit`: unwind through the nearest enclosing loop context. Crossing a
    /// `stopped` frame (or running out of frames) is `invalidexit`
    pub(crate) fn unwind_to_loop(&mut self) -> PsResult<()> {
        for index in (0..self.execution_stack.len()).rev() {
            match &self.execution_stack[index] {
                ExecutionItem::Context(ctx) if ctx.is_loop() => {
                    self.execution_stack.truncate(index);
                    return Ok(());
                }
                ExecutionItem::Context(ExecutionContext::Stopped) => break,
                _ => {}
            }
        }

        anyhow::bail!(PostScriptError::InvalidExit)
    }

    /// `stop`: unwind to the nearest `stopped` frame; at top level, end the
    /// program
    pub(crate) fn stop(&mut self) {
        if self.unwind_to_stopped() {
            self.push(Object::boolean(true));
        } else {
            self.execution_stack.clear();
        }
    }

    pub(crate) fn request_quit(&mut self) {
        self.quit = true;
    }

    /// Reads one object from a file on the execution stack, or `None` at EOF
    pub(crate) fn read_object_from_file(
        &mut self,
        file_index: FileIndex,
    ) -> PsResult<Option<Object>> {
        let mut file = self
            .files
            .take(&file_index)
            .ok_or_else(|| anyhow!(PostScriptError::IoError))?;

        let result = if file.closed {
            Ok(None)
        } else {
            match file.lexer_mut() {
                Some(lexer) => scanner::scan_object(self, lexer),
                None => Err(anyhow!(PostScriptError::IoError)),
            }
        };

        self.files.restore(file_index, file);

        result
    }
}

/// Name resolution
impl Interpreter<'_> {
    /// Walks the dictionary stack top-down; the topmost definition wins
    pub(crate) fn symbol_lookup(&self, name: &Name) -> PsResult<Object> {
        self.lookup(name)
            .ok_or_else(|| anyhow!(PostScriptError::Undefined { name: name.clone() }))
    }

    pub(crate) fn lookup(&self, name: &Name) -> Option<Object> {
        let key = DictKey::Name(name.clone());

        for dict in self.dictionary_stack.iter().rev() {
            if let Some(obj) = self.dict_ref(*dict).get(&key) {
                return Some(obj.clone());
            }
        }

        None
    }

    /// The dictionary that defines `key`, as for `where`
    pub(crate) fn where_defined(&self, key: &DictKey) -> Option<DictionaryIndex> {
        self.dictionary_stack
            .iter()
            .rev()
            .copied()
            .find(|dict| self.dict_ref(*dict).contains(key))
    }

    pub(crate) fn current_dict(&self) -> DictionaryIndex {
        *self
            .dictionary_stack
            .last()
            .expect("bootstrap dictionaries are never popped")
    }
}

/// Operand-stack helpers: typed pops fail with `typecheck` on a mismatch and
/// `stackunderflow` on shortage
impl Interpreter<'_> {
    pub(crate) fn push(&mut self, obj: Object) {
        self.operand_stack.push(obj);
    }

    pub(crate) fn pop(&mut self) -> PsResult<Object> {
        self.operand_stack
            .pop()
            .ok_or_else(|| anyhow!(PostScriptError::StackUnderflow))
    }

    pub(crate) fn peek(&self, depth: usize) -> PsResult<&Object> {
        let len = self.operand_stack.len();

        if depth >= len {
            anyhow::bail!(PostScriptError::StackUnderflow);
        }

        Ok(&self.operand_stack[len - 1 - depth])
    }

    pub(crate) fn pop_int(&mut self) -> PsResult<i64> {
        match self.pop()?.value {
            Value::Integer(n) => Ok(n),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_usize(&mut self) -> PsResult<usize> {
        usize::try_from(self.pop_int()?)
            .map_err(|_| anyhow!(PostScriptError::RangeCheck))
    }

    pub(crate) fn pop_number(&mut self) -> PsResult<f64> {
        match self.pop()?.value {
            Value::Integer(n) => Ok(n as f64),
            Value::Real(r) => Ok(r),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_bool(&mut self) -> PsResult<bool> {
        match self.pop()?.value {
            Value::Boolean(b) => Ok(b),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_name(&mut self) -> PsResult<Name> {
        match self.pop()?.value {
            Value::Name(name) => Ok(name),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_array(&mut self) -> PsResult<ArraySlice> {
        match self.pop()?.value {
            Value::Array(slice) => Ok(slice),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    /// Pops an executable array, keeping the whole object for deferred
    /// execution
    pub(crate) fn pop_procedure(&mut self) -> PsResult<Object> {
        let obj = self.pop()?;

        if !obj.is_procedure() {
            anyhow::bail!(PostScriptError::TypeCheck);
        }

        Ok(obj)
    }

    pub(crate) fn pop_string(&mut self) -> PsResult<StringSlice> {
        match self.pop()?.value {
            Value::String(slice) => Ok(slice),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_dict(&mut self) -> PsResult<DictionaryIndex> {
        match self.pop()?.value {
            Value::Dictionary(dict) => Ok(dict),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    pub(crate) fn pop_file(&mut self) -> PsResult<FileIndex> {
        match self.pop()?.value {
            Value::File(file) => Ok(file),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        }
    }

    /// Number of objects above the topmost mark, for `]`, `>>`, and
    /// `counttomark`
    pub(crate) fn count_to_mark(&self) -> PsResult<usize> {
        self.operand_stack
            .iter()
            .rposition(|obj| matches!(obj.value, Value::Mark))
            .map(|index| self.operand_stack.len() - 1 - index)
            .ok_or_else(|| anyhow!(PostScriptError::UnmatchedMark))
    }
}

/// Arena accessors. All reads and writes funnel through here so access
/// attributes and range checks are enforced uniformly
impl Interpreter<'_> {
    pub(crate) fn new_array(&mut self, elements: Vec<Object>) -> ArraySlice {
        let len = elements.len();
        let index = self.arrays.insert(PsArray::from_objects(elements));

        ArraySlice {
            index,
            start: 0,
            len,
        }
    }

    pub(crate) fn new_string(&mut self, bytes: Vec<u8>) -> StringSlice {
        let len = bytes.len();
        let index = self.strings.insert(PsString::from_bytes(bytes));

        StringSlice {
            index,
            start: 0,
            len,
        }
    }

    pub(crate) fn new_dict(&mut self, dict: PsDictionary) -> DictionaryIndex {
        self.dictionaries.insert(dict)
    }

    fn array_ref(&self, index: ArrayIndex) -> &PsArray {
        self.arrays.get(&index).expect("array indices are stable")
    }

    fn array_ref_mut(&mut self, index: ArrayIndex) -> &mut PsArray {
        self.arrays
            .get_mut(&index)
            .expect("array indices are stable")
    }

    pub(crate) fn array_access(&self, slice: ArraySlice) -> Access {
        self.array_ref(slice.index).access()
    }

    pub(crate) fn set_array_access(&mut self, slice: ArraySlice, access: Access) {
        self.array_ref_mut(slice.index).set_access(access);
    }

    pub(crate) fn array_get(&self, slice: ArraySlice, index: usize) -> PsResult<Object> {
        if !self.array_access(slice).readable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        self.array_get_unchecked(slice, index)
    }

    /// Element read without the access check, for procedure execution
    pub(crate) fn array_get_unchecked(
        &self,
        slice: ArraySlice,
        index: usize,
    ) -> PsResult<Object> {
        if index >= slice.len {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        Ok(self.array_ref(slice.index).get(slice.start + index)?.clone())
    }

    pub(crate) fn array_put(
        &mut self,
        slice: ArraySlice,
        index: usize,
        obj: Object,
    ) -> PsResult<()> {
        if !self.array_access(slice).writable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        if index >= slice.len {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        self.array_ref_mut(slice.index).put(slice.start + index, obj)
    }

    pub(crate) fn array_elements(&self, slice: ArraySlice) -> PsResult<Vec<Object>> {
        if !self.array_access(slice).readable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        Ok(self.array_ref(slice.index).as_slice()[slice.start..slice.start + slice.len].to_vec())
    }

    /// Overwrites `slice[at..at + source.len]`, as for `putinterval`
    pub(crate) fn array_write(
        &mut self,
        slice: ArraySlice,
        at: usize,
        source: Vec<Object>,
    ) -> PsResult<()> {
        if !self.array_access(slice).writable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        if at + source.len() > slice.len {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        let start = slice.start + at;
        self.array_ref_mut(slice.index).as_mut_slice()[start..start + source.len()]
            .clone_from_slice(&source);

        Ok(())
    }

    fn string_ref(&self, index: StringIndex) -> &PsString {
        self.strings.get(&index).expect("string indices are stable")
    }

    fn string_ref_mut(&mut self, index: StringIndex) -> &mut PsString {
        self.strings
            .get_mut(&index)
            .expect("string indices are stable")
    }

    pub(crate) fn string_access(&self, slice: StringSlice) -> Access {
        self.string_ref(slice.index).access()
    }

    pub(crate) fn set_string_access(&mut self, slice: StringSlice, access: Access) {
        self.string_ref_mut(slice.index).set_access(access);
    }

    pub(crate) fn string_bytes(&self, slice: StringSlice) -> PsResult<Vec<u8>> {
        if !self.string_access(slice).readable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        Ok(self.string_ref(slice.index).as_bytes()[slice.start..slice.start + slice.len].to_vec())
    }

    /// Content read for execution, permitted on execute-only strings
    pub(crate) fn string_bytes_for_execution(&self, slice: StringSlice) -> PsResult<Vec<u8>> {
        if !self.string_access(slice).executable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        Ok(self.string_ref(slice.index).as_bytes()[slice.start..slice.start + slice.len].to_vec())
    }

    pub(crate) fn string_get(&self, slice: StringSlice, index: usize) -> PsResult<u8> {
        if !self.string_access(slice).readable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        if index >= slice.len {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        self.string_ref(slice.index).get(slice.start + index)
    }

    pub(crate) fn string_put(&mut self, slice: StringSlice, index: usize, byte: u8) -> PsResult<()> {
        if !self.string_access(slice).writable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        if index >= slice.len {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        self.string_ref_mut(slice.index).put(slice.start + index, byte)
    }

    /// Overwrites `slice[at..at + bytes.len]`, as for `putinterval` and `cvs`
    pub(crate) fn string_write(
        &mut self,
        slice: StringSlice,
        at: usize,
        bytes: &[u8],
    ) -> PsResult<()> {
        if !self.string_access(slice).writable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        if at + bytes.len() > slice.len {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        let start = slice.start + at;
        self.string_ref_mut(slice.index).as_mut_bytes()[start..start + bytes.len()]
            .copy_from_slice(bytes);

        Ok(())
    }

    pub(crate) fn dict_ref(&self, index: DictionaryIndex) -> &PsDictionary {
        self.dictionaries
            .get(&index)
            .expect("dictionary indices are stable")
    }

    pub(crate) fn dict_ref_mut(&mut self, index: DictionaryIndex) -> &mut PsDictionary {
        self.dictionaries
            .get_mut(&index)
            .expect("dictionary indices are stable")
    }

    pub(crate) fn dict_get(&self, index: DictionaryIndex, key: &DictKey) -> PsResult<Option<Object>> {
        if !self.dict_ref(index).access().readable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        Ok(self.dict_ref(index).get(key).cloned())
    }

    pub(crate) fn dict_put(
        &mut self,
        index: DictionaryIndex,
        key: DictKey,
        value: Object,
    ) -> PsResult<()> {
        if !self.dict_ref(index).access().writable() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        self.dict_ref_mut(index).insert(key, value)
    }

    /// Converts an object into a dictionary key. Names and strings share key
    /// identity; integral reals collapse onto integer keys
    pub(crate) fn key_for(&self, obj: &Object) -> PsResult<DictKey> {
        Ok(match &obj.value {
            Value::Name(name) => DictKey::Name(name.clone()),
            Value::String(slice) => DictKey::Name(Name::from_bytes(self.string_bytes(*slice)?)),
            Value::Integer(n) => DictKey::Integer(*n),
            Value::Real(r) if r.fract() == 0.0 && r.abs() < i64::MAX as f64 => {
                DictKey::Integer(*r as i64)
            }
            Value::Real(r) => DictKey::Real(r.to_bits()),
            Value::Boolean(b) => DictKey::Boolean(*b),
            Value::Null => DictKey::Null,
            Value::Operator(op) => DictKey::Name(Name::new(op.name)),
            _ => anyhow::bail!(PostScriptError::TypeCheck),
        })
    }
}

/// Equality, text forms, and miscellaneous services shared by operators
impl Interpreter<'_> {
    /// `eq` semantics: numeric cross-type comparison, name⇄string content
    /// comparison, composites by shared value
    pub(crate) fn objects_equal(&self, a: &Object, b: &Object) -> bool {
        match (&a.value, &b.value) {
            (Value::Integer(n1), Value::Integer(n2)) => n1 == n2,
            (Value::Real(r1), Value::Real(r2)) => r1 == r2,
            (Value::Integer(n), Value::Real(r)) | (Value::Real(r), Value::Integer(n)) => {
                *r == *n as f64
            }
            (Value::Boolean(b1), Value::Boolean(b2)) => b1 == b2,
            (Value::Name(n1), Value::Name(n2)) => n1 == n2,
            (Value::Name(name), Value::String(string))
            | (Value::String(string), Value::Name(name)) => self
                .string_bytes(*string)
                .map_or(false, |bytes| bytes == name.as_bytes()),
            (Value::String(s1), Value::String(s2)) => {
                match (self.string_bytes(*s1), self.string_bytes(*s2)) {
                    (Ok(b1), Ok(b2)) => b1 == b2,
                    _ => false,
                }
            }
            (Value::Array(a1), Value::Array(a2)) => a1 == a2,
            (Value::Dictionary(d1), Value::Dictionary(d2)) => d1 == d2,
            (Value::File(f1), Value::File(f2)) => f1 == f2,
            (Value::Operator(o1), Value::Operator(o2)) => o1 == o2,
            (Value::FontId(id1), Value::FontId(id2)) => id1 == id2,
            (Value::Mark, Value::Mark) | (Value::Null, Value::Null) | (Value::Save, Value::Save) => {
                true
            }
            _ => false,
        }
    }

    /// The `=`/`cvs` text form
    pub(crate) fn format_brief(&self, obj: &Object) -> PsResult<Vec<u8>> {
        Ok(match &obj.value {
            Value::Integer(n) => n.to_string().into_bytes(),
            Value::Real(r) => format_real(*r).into_bytes(),
            Value::Boolean(b) => b.to_string().into_bytes(),
            Value::Name(name) => name.as_bytes().to_vec(),
            Value::String(slice) => self.string_bytes(*slice)?,
            Value::Operator(op) => op.name.as_bytes().to_vec(),
            _ => b"--nostringval--".to_vec(),
        })
    }

    /// The `==`/`pstack` syntactic form. Inspecting the content of an
    /// execute-only container is an access violation
    pub(crate) fn format_verbose(&self, obj: &Object) -> PsResult<Vec<u8>> {
        self.format_verbose_depth(obj, 0)
    }

    fn format_verbose_depth(&self, obj: &Object, depth: usize) -> PsResult<Vec<u8>> {
        if depth > 16 {
            return Ok(b"...".to_vec());
        }

        Ok(match &obj.value {
            Value::Integer(n) => n.to_string().into_bytes(),
            Value::Real(r) => format_real(*r).into_bytes(),
            Value::Boolean(b) => b.to_string().into_bytes(),
            Value::Null => b"null".to_vec(),
            Value::Mark => b"-mark-".to_vec(),
            Value::Save => b"-save-".to_vec(),
            Value::FontId(..) => b"-fontid-".to_vec(),
            Value::Name(name) if obj.executable => name.as_bytes().to_vec(),
            Value::Name(name) => {
                let mut out = b"/".to_vec();
                out.extend_from_slice(name.as_bytes());
                out
            }
            Value::Operator(op) => format!("--{}--", op.name).into_bytes(),
            Value::String(slice) => {
                let mut out = b"(".to_vec();
                out.extend_from_slice(&self.string_bytes(*slice)?);
                out.push(b')');
                out
            }
            Value::Array(slice) => {
                let (open, close): (&[u8], &[u8]) = if obj.executable {
                    (b"{", b"}")
                } else {
                    (b"[", b"]")
                };

                let mut out = open.to_vec();
                for (i, element) in self.array_elements(*slice)?.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    out.extend_from_slice(&self.format_verbose_depth(element, depth + 1)?);
                }
                out.extend_from_slice(close);
                out
            }
            Value::Dictionary(..) => b"-dict-".to_vec(),
            Value::File(..) => b"-file-".to_vec(),
        })
    }

    pub(crate) fn write_stdout(&mut self, bytes: &[u8]) -> PsResult<()> {
        self.stdout_file().write_bytes(bytes)
    }

    pub(crate) fn stdout_index(&self) -> FileIndex {
        self.stdout_file
    }

    fn stdout_file(&mut self) -> &mut PsFile {
        self.files
            .get_mut(&self.stdout_file)
            .expect("stdout file exists")
    }

    /// `bind`: replace executable names currently defined as operators with
    /// the operator objects themselves; recurse into nested procedures
    pub(crate) fn bind_procedure(&mut self, slice: ArraySlice) -> PsResult<()> {
        let mut visited = Vec::new();

        self.bind_inner(slice, &mut visited)
    }

    fn bind_inner(&mut self, slice: ArraySlice, visited: &mut Vec<ArrayIndex>) -> PsResult<()> {
        if visited.contains(&slice.index) {
            return Ok(());
        }
        visited.push(slice.index);

        for i in 0..slice.len {
            let element = self.array_get_unchecked(slice, i)?;

            match &element.value {
                Value::Name(name) if element.executable => {
                    if let Some(resolved) = self.lookup(name) {
                        if matches!(resolved.value, Value::Operator(..)) {
                            if self.array_access(slice).writable() {
                                self.array_ref_mut(slice.index)
                                    .put(slice.start + i, resolved)?;
                            }
                        }
                    }
                }
                Value::Array(nested) if element.is_procedure() => {
                    self.bind_inner(*nested, visited)?;
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Byte-level file primitives. Filter files pull from their underlying file
/// through the arena's take/restore discipline
impl Interpreter<'_> {
    pub(crate) fn file_read_byte(&mut self, index: FileIndex) -> PsResult<Option<u8>> {
        let mut file = self
            .files
            .take(&index)
            .ok_or_else(|| anyhow!(PostScriptError::IoError))?;

        let result = self.read_byte_from(&mut file);
        self.files.restore(index, file);

        result
    }

    pub(crate) fn file_peek_byte(&mut self, index: FileIndex) -> PsResult<Option<u8>> {
        let mut file = self
            .files
            .take(&index)
            .ok_or_else(|| anyhow!(PostScriptError::IoError))?;

        let result = self.peek_byte_from(&mut file);
        self.files.restore(index, file);

        result
    }

    fn read_byte_from(&mut self, file: &mut PsFile) -> PsResult<Option<u8>> {
        if file.closed {
            return Ok(None);
        }

        if !file.mode.can_read() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        if matches!(file.body, crate::file::FileBody::Ascii85Decode { .. }) {
            self.refill_ascii85(file)?;
        }

        match &mut file.body {
            crate::file::FileBody::Memory(lexer) => Ok(lexer.stream().next_byte()),
            crate::file::FileBody::Capture(..) => anyhow::bail!(PostScriptError::IoError),
            crate::file::FileBody::Ascii85Decode { decoded, .. } => Ok(decoded.pop_front()),
        }
    }

    fn peek_byte_from(&mut self, file: &mut PsFile) -> PsResult<Option<u8>> {
        if file.closed {
            return Ok(None);
        }

        if matches!(file.body, crate::file::FileBody::Ascii85Decode { .. }) {
            self.refill_ascii85(file)?;
        }

        match &mut file.body {
            crate::file::FileBody::Memory(lexer) => Ok(lexer.stream().peek(0)),
            crate::file::FileBody::Capture(..) => anyhow::bail!(PostScriptError::IoError),
            crate::file::FileBody::Ascii85Decode { decoded, .. } => Ok(decoded.front().copied()),
        }
    }

    /// Decodes base-85 groups from the underlying file until at least one
    /// byte is buffered or the `~>` terminator (or EOF) is reached
    fn refill_ascii85(&mut self, file: &mut PsFile) -> PsResult<()> {
        let crate::file::FileBody::Ascii85Decode {
            source,
            decoded,
            eof,
        } = &mut file.body
        else {
            return Ok(());
        };

        if !decoded.is_empty() || *eof {
            return Ok(());
        }

        let source = *source;
        let mut group = [0u8; 5];
        let mut count = 0usize;

        loop {
            let byte = self.file_read_byte(source)?;

            match byte {
                Some(b) if b.is_ascii_whitespace() || b == b'\0' => {}
                Some(b'z') if count == 0 => {
                    decoded.extend([0, 0, 0, 0]);
                    break;
                }
                Some(b @ b'!'..=b'u') => {
                    group[count] = b - b'!';
                    count += 1;

                    if count == 5 {
                        decoded.extend(crate::file::decode_ascii85_group(&group)?);
                        break;
                    }
                }
                Some(b'~') | None => {
                    if byte.is_some() && self.file_read_byte(source)? != Some(b'>') {
                        anyhow::bail!(PostScriptError::IoError);
                    }

                    *eof = true;

                    match count {
                        0 => {}
                        1 => anyhow::bail!(PostScriptError::IoError),
                        _ => {
                            for slot in group.iter_mut().skip(count) {
                                *slot = 84;
                            }

                            let bytes = crate::file::decode_ascii85_group(&group)?;
                            decoded.extend(bytes[..count - 1].iter().copied());
                        }
                    }

                    break;
                }
                Some(..) => anyhow::bail!(PostScriptError::IoError),
            }
        }

        Ok(())
    }

    pub(crate) fn file_write(&mut self, index: FileIndex, bytes: &[u8]) -> PsResult<()> {
        let file = self
            .files
            .get_mut(&index)
            .ok_or_else(|| anyhow!(PostScriptError::IoError))?;

        file.write_bytes(bytes)
    }

    /// Closing an already-closed file has no effect
    pub(crate) fn file_close(&mut self, index: FileIndex) {
        if let Some(file) = self.files.get_mut(&index) {
            file.closed = true;
        }
    }

    /// The operand-stack object form of a dictionary key, for `forall`
    pub(crate) fn key_object(&self, key: &DictKey) -> Object {
        match key {
            DictKey::Name(name) => Object::literal_name(name.clone()),
            DictKey::Integer(n) => Object::integer(*n),
            DictKey::Real(bits) => Object::real(f64::from_bits(*bits)),
            DictKey::Boolean(b) => Object::boolean(*b),
            DictKey::Null => Object::null(),
        }
    }
}

fn context_finished(ctx: &ExecutionContext) -> bool {
    match ctx {
        ExecutionContext::Procedure(c) => c.finished(),
        ExecutionContext::For(c) => c.finished(),
        ExecutionContext::Repeat(c) => c.finished(),
        ExecutionContext::Loop(..) => false,
        ExecutionContext::ArrayForAll(c) => c.finished(),
        ExecutionContext::DictionaryForAll(c) => c.finished(),
        ExecutionContext::StringForAll(c) => c.finished(),
        ExecutionContext::KShow(c) => c.finished(),
        // once a stopped frame surfaces, its child completed normally
        ExecutionContext::Stopped => true,
    }
}

fn is_token_source(obj: &Object) -> bool {
    obj.executable && matches!(obj.value, Value::File(..))
}

fn is_string_source(obj: &Object) -> bool {
    obj.executable && matches!(obj.value, Value::String(..))
}

/// Reals keep a trailing `.0` so their text form stays distinguishable from
/// integers
pub(crate) fn format_real(r: f64) -> String {
    if r == r.trunc() && r.is_finite() && r.abs() < 1e15 {
        format!("{:.1}", r)
    } else {
        format!("{}", r)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graphics::RecordingDevice;

    fn run_program(source: &[u8]) -> (Vec<Object>, Vec<u8>) {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(source, &mut device);

        interp.run().unwrap();

        let stdout = interp.stdout().to_vec();
        (interp.operand_stack.clone(), stdout)
    }

    fn run_expecting_error(source: &[u8]) -> PostScriptError {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(source, &mut device);

        let err = interp.run().unwrap_err();
        err.downcast::<PostScriptError>().unwrap()
    }

    #[test]
    fn add_two_integers() {
        let (stack, _) = run_program(b"1 2 add");

        assert_eq!(stack, vec![Object::integer(3)]);
    }

    #[test]
    fn type_widening() {
        let (stack, _) = run_program(b"1 2 add 1 2.0 add 1 2 div");

        assert_eq!(
            stack,
            vec![Object::integer(3), Object::real(3.0), Object::real(0.5)]
        );
    }

    #[test]
    fn def_and_lookup() {
        let (stack, _) = run_program(b"/x 10 def x x mul");

        assert_eq!(stack, vec![Object::integer(100)]);
    }

    #[test]
    fn print_through_stdout() {
        let (stack, stdout) = run_program(b"1 2 add =");

        assert!(stack.is_empty());
        assert_eq!(stdout, b"3\n");
    }

    #[test]
    fn forall_over_array() {
        let (stack, _) = run_program(b"[1 2 3] { 2 mul } forall");

        assert_eq!(
            stack,
            vec![
                Object::integer(2),
                Object::integer(4),
                Object::integer(6)
            ]
        );
    }

    #[test]
    fn for_loop_pushes_integer_control_values() {
        let (stack, _) = run_program(b"0 1 9 { } for");

        let expected: Vec<Object> = (0..=9).map(Object::integer).collect();
        assert_eq!(stack, expected);
    }

    #[test]
    fn for_loop_count_scenario() {
        let (stack, _) = run_program(b"0 1 4 { } for count");

        assert_eq!(stack.len(), 6);
        assert_eq!(stack.last(), Some(&Object::integer(5)));
    }

    #[test]
    fn for_loop_real_control_values() {
        let (stack, _) = run_program(b"3 -.5 1 { } for");

        let expected: Vec<Object> = [3.0, 2.5, 2.0, 1.5, 1.0]
            .iter()
            .map(|&r| Object::real(r))
            .collect();
        assert_eq!(stack, expected);
    }

    #[test]
    fn string_length() {
        let (stack, _) = run_program(b"(hello) length");

        assert_eq!(stack, vec![Object::integer(5)]);
    }

    #[test]
    fn dict_literal_and_get() {
        let (stack, _) = run_program(b"<< /a 1 /b 2 >> /a get");

        assert_eq!(stack, vec![Object::integer(1)]);
    }

    #[test]
    fn repeat_prints() {
        let (stack, stdout) = run_program(b"3 { (x) print } repeat");

        assert!(stack.is_empty());
        assert_eq!(stdout, b"xxx");
    }

    #[test]
    fn roll_positive_and_negative() {
        let (stack, _) = run_program(b"1 2 3 3 1 roll");
        assert_eq!(
            stack,
            vec![Object::integer(3), Object::integer(1), Object::integer(2)]
        );

        let (stack, _) = run_program(b"1 2 3 3 -1 roll");
        assert_eq!(
            stack,
            vec![Object::integer(2), Object::integer(3), Object::integer(1)]
        );
    }

    #[test]
    fn stopped_catches_division_by_zero() {
        let (stack, _) = run_program(b"{ 1 2 add 0 div } stopped");

        assert_eq!(stack, vec![Object::boolean(true)]);
    }

    #[test]
    fn stopped_normal_completion_pushes_false() {
        let (stack, _) = run_program(b"{ 1 } stopped");

        assert_eq!(stack, vec![Object::integer(1), Object::boolean(false)]);
    }

    #[test]
    fn procedure_nesting() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(b"{ 1 { 2 } 3 }", &mut device);

        interp.run().unwrap();

        let proc = interp.operand_stack.pop().unwrap();
        assert!(proc.is_procedure());

        let Value::Array(outer) = proc.value else {
            panic!("expected array")
        };
        assert_eq!(outer.len, 3);

        let middle = interp.array_get(outer, 1).unwrap();
        assert!(middle.is_procedure());

        let Value::Array(inner) = middle.value else {
            panic!("expected array")
        };
        assert_eq!(inner.len, 1);
        assert_eq!(
            interp.array_get(inner, 0).unwrap(),
            Object::integer(2)
        );
    }

    #[test]
    fn dictfull_on_third_new_key() {
        let err = run_expecting_error(
            b"/d 2 dict def
              d /a 1 put
              d /b 2 put
              d /c 3 put",
        );

        assert_eq!(err.name(), "dictfull");
    }

    #[test]
    fn dict_overwrite_at_capacity_succeeds() {
        let (stack, _) = run_program(
            b"/d 2 dict def
              d /a 1 put
              d /b 2 put
              d /a 9 put
              d /a get",
        );

        assert_eq!(stack, vec![Object::integer(9)]);
    }

    #[test]
    fn undefined_name_reports_error() {
        let err = run_expecting_error(b"no_such_operator");

        assert_eq!(err.name(), "undefined");
    }

    #[test]
    fn runaway_program_times_out() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(b"{ } loop", &mut device).with_step_limit(5_000);

        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<PostScriptError>().unwrap().name(),
            "timeout"
        );
    }

    #[test]
    fn quit_stops_execution() {
        let (stack, _) = run_program(b"1 quit 2");

        assert_eq!(stack, vec![Object::integer(1)]);
    }

    #[test]
    fn exit_leaves_loop() {
        let (stack, _) = run_program(b"1 { 2 exit 3 } loop 4");

        assert_eq!(
            stack,
            vec![Object::integer(1), Object::integer(2), Object::integer(4)]
        );
    }

    #[test]
    fn exit_outside_loop_is_invalidexit() {
        let err = run_expecting_error(b"exit");

        assert_eq!(err.name(), "invalidexit");
    }

    #[test]
    fn executable_string_is_rescanned() {
        let (stack, _) = run_program(b"(1 2 add) cvx exec");

        assert_eq!(stack, vec![Object::integer(3)]);
    }

    #[test]
    fn immediately_evaluated_name() {
        let (stack, _) = run_program(b"/x 7 def //x");

        assert_eq!(stack, vec![Object::integer(7)]);
    }

    #[test]
    fn error_name_recorded_in_error_info() {
        let (stack, stdout) = run_program(b"{ 0 0 div } stopped pop handleerror");

        assert!(stack.is_empty());
        assert_eq!(stdout, b"Error: undefinedresult\n");
    }

    #[test]
    fn scanner_integer_round_trip() {
        for n in [0i64, 1, -1, 42, i32::MAX as i64, i32::MIN as i64] {
            let source = format!("{}", n);
            let (stack, _) = run_program(source.as_bytes());

            assert_eq!(stack, vec![Object::integer(n)], "round-trip of {}", n);
        }
    }

    #[test]
    fn scanner_real_round_trip() {
        for (source, expected) in [
            ("0.5", 0.5f64),
            ("-12.25", -12.25),
            ("3.0", 3.0),
            ("1e-3", 1e-3),
            ("6.02e3", 6020.0),
        ] {
            let (stack, _) = run_program(source.as_bytes());

            assert_eq!(stack.len(), 1, "scanning {:?}", source);
            let Value::Real(scanned) = stack[0].value else {
                panic!("expected real from {:?}", source);
            };
            assert!((scanned - expected).abs() <= 1e-12);
        }
    }

    #[test]
    fn bounding_box_exposed_on_handle() {
        let mut device = RecordingDevice::new();
        let interp = Interpreter::new(
            b"%!PS-Adobe-3.0 EPSF-3.0\n%%BoundingBox: 0 0 200 100\n%%EndComments\n",
            &mut device,
        );

        let bbox = interp.bounding_box().unwrap();
        assert_eq!(bbox.upper_right_x, 200);
        assert_eq!(bbox.upper_right_y, 100);
    }

    #[test]
    fn shared_subarray_observes_parent_mutation() {
        let (stack, _) = run_program(
            b"/a [1 2 3 4 5] def
              /sub a 1 3 getinterval def
              a 2 99 put
              sub 1 get",
        );

        assert_eq!(stack, vec![Object::integer(99)]);
    }

    #[test]
    fn operand_stack_overflow_detected() {
        let err = run_expecting_error(b"{ 1 } loop");

        assert_eq!(err.name(), "stackoverflow");
    }
}
