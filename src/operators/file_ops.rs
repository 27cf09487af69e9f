//! File and debug-output operators. The debugging operators write to the
//! `%stdout` capture file, which the host can read back after `run`.

use crate::{
    error::{PostScriptError, PsResult},
    file::{AccessMode, PsFile},
    interpreter::{ExecutionItem, Interpreter},
    object::{Object, Value},
};

/// `=`: brief text form plus a newline
pub(crate) fn print_brief(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    let mut text = interp.format_brief(&obj)?;
    text.push(b'\n');

    interp.write_stdout(&text)
}

/// `==`: full syntactic form plus a newline
pub(crate) fn print_verbose(interp: &mut Interpreter) -> PsResult<()> {
    let obj = interp.pop()?;

    let mut text = interp.format_verbose(&obj)?;
    text.push(b'\n');

    interp.write_stdout(&text)
}

/// Prints the whole operand stack, topmost first, without disturbing it
pub(crate) fn stack_op(interp: &mut Interpreter) -> PsResult<()> {
    for obj in interp.operand_stack.clone().iter().rev() {
        let mut text = interp.format_brief(obj)?;
        text.push(b'\n');
        interp.write_stdout(&text)?;
    }

    Ok(())
}

pub(crate) fn pstack(interp: &mut Interpreter) -> PsResult<()> {
    for obj in interp.operand_stack.clone().iter().rev() {
        let mut text = interp.format_verbose(obj)?;
        text.push(b'\n');
        interp.write_stdout(&text)?;
    }

    Ok(())
}

pub(crate) fn print(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;

    let bytes = interp.string_bytes(slice)?;
    interp.write_stdout(&bytes)
}

/// `file byte write`: the low eight bits of the integer
pub(crate) fn write(interp: &mut Interpreter) -> PsResult<()> {
    let byte = interp.pop_int()?;
    let file = interp.pop_file()?;

    interp.file_write(file, &[(byte & 0xFF) as u8])
}

pub(crate) fn writestring(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let file = interp.pop_file()?;

    let bytes = interp.string_bytes(slice)?;
    interp.file_write(file, &bytes)
}

pub(crate) fn writehexstring(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let file = interp.pop_file()?;

    let bytes = interp.string_bytes(slice)?;
    let mut hex = Vec::with_capacity(bytes.len() * 2);

    for byte in bytes {
        hex.extend_from_slice(format!("{:02x}", byte).as_bytes());
    }

    interp.file_write(file, &hex)
}

/// `file read byte true`, or `false` at end of file
pub(crate) fn read(interp: &mut Interpreter) -> PsResult<()> {
    let file = interp.pop_file()?;

    match interp.file_read_byte(file)? {
        Some(byte) => {
            interp.push(Object::integer(i64::from(byte)));
            interp.push(Object::boolean(true));
        }
        None => interp.push(Object::boolean(false)),
    }

    Ok(())
}

/// Fills the buffer string from the file; the boolean reports whether it was
/// filled completely
pub(crate) fn readstring(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let file = interp.pop_file()?;

    if slice.len == 0 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let mut filled = 0;
    while filled < slice.len {
        match interp.file_read_byte(file)? {
            Some(byte) => {
                interp.string_put(slice, filled, byte)?;
                filled += 1;
            }
            None => break,
        }
    }

    interp.push(Object::literal(Value::String(slice.subslice(0, filled))));
    interp.push(Object::boolean(filled == slice.len));

    Ok(())
}

/// Reads through CR, LF, or CRLF, consuming but not storing the terminator.
/// The boolean is false when EOF arrived before any terminator
pub(crate) fn readline(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let file = interp.pop_file()?;

    let mut filled = 0;
    let terminated = loop {
        match interp.file_read_byte(file)? {
            Some(b'\n') => break true,
            Some(b'\r') => {
                if interp.file_peek_byte(file)? == Some(b'\n') {
                    interp.file_read_byte(file)?;
                }
                break true;
            }
            Some(byte) => {
                if filled >= slice.len {
                    anyhow::bail!(PostScriptError::RangeCheck);
                }
                interp.string_put(slice, filled, byte)?;
                filled += 1;
            }
            None => break false,
        }
    };

    interp.push(Object::literal(Value::String(slice.subslice(0, filled))));
    interp.push(Object::boolean(terminated));

    Ok(())
}

/// Like `readstring`, but decodes pairs of hex digits and skips every other
/// character
pub(crate) fn readhexstring(interp: &mut Interpreter) -> PsResult<()> {
    let slice = interp.pop_string()?;
    let file = interp.pop_file()?;

    if slice.len == 0 {
        anyhow::bail!(PostScriptError::RangeCheck);
    }

    let mut filled = 0;
    'fill: while filled < slice.len {
        let mut digits = [0u8; 2];

        for digit in &mut digits {
            *digit = loop {
                match interp.file_read_byte(file)? {
                    Some(b) if b.is_ascii_hexdigit() => break hex_value(b),
                    Some(..) => {}
                    None => break 'fill,
                }
            };
        }

        interp.string_put(slice, filled, (digits[0] << 4) | digits[1])?;
        filled += 1;
    }

    interp.push(Object::literal(Value::String(slice.subslice(0, filled))));
    interp.push(Object::boolean(filled == slice.len));

    Ok(())
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => unreachable!("caller checked is_ascii_hexdigit"),
    }
}

/// The innermost file being executed
pub(crate) fn currentfile(interp: &mut Interpreter) -> PsResult<()> {
    let innermost = interp.execution_stack.iter().rev().find_map(|item| {
        match item {
            ExecutionItem::Object(obj) if matches!(obj.value, Value::File(..)) => {
                Some(obj.value.clone())
            }
            _ => None,
        }
    });

    match innermost {
        Some(value) => interp.push(Object::literal(value)),
        None => {
            // no file is executing; hand back a closed placeholder
            let mut placeholder = PsFile::memory("%closed", Vec::new());
            placeholder.closed = true;
            let index = interp.files.insert(placeholder);
            interp.push(Object::literal(Value::File(index)));
        }
    }

    Ok(())
}

/// Closing an already-closed file has no effect
pub(crate) fn closefile(interp: &mut Interpreter) -> PsResult<()> {
    let file = interp.pop_file()?;

    interp.file_close(file);

    Ok(())
}

/// `filename access file`
pub(crate) fn file(interp: &mut Interpreter) -> PsResult<()> {
    let access_slice = interp.pop_string()?;
    let name_slice = interp.pop_string()?;

    let mode = AccessMode::parse(&interp.string_bytes(access_slice)?)?;
    let name_bytes = interp.string_bytes(name_slice)?;
    let name = String::from_utf8_lossy(&name_bytes).into_owned();

    let object = match name.as_str() {
        "%stdout" => {
            if !mode.can_write() {
                anyhow::bail!(PostScriptError::InvalidFileAccess);
            }
            Object::literal(Value::File(interp.stdout_index()))
        }
        "%stdin" => {
            if mode.can_write() {
                anyhow::bail!(PostScriptError::InvalidFileAccess);
            }

            let contents = interp
                .file_system
                .get_file("%stdin")
                .map(<[u8]>::to_vec)
                .unwrap_or_default();
            let index = interp.files.insert(PsFile::memory("%stdin", contents));
            Object::literal(Value::File(index))
        }
        _ if mode.can_read() => {
            let contents = interp.file_system.get_file(&name)?.to_vec();
            let mut file = PsFile::memory(&name, contents);
            file.mode = mode;
            let index = interp.files.insert(file);
            Object::literal(Value::File(index))
        }
        _ => {
            let index = interp.files.insert(PsFile::capture(&name, mode));
            Object::literal(Value::File(index))
        }
    };

    interp.push(object);

    Ok(())
}

/// Only `/ASCII85Decode` is registered
pub(crate) fn filter(interp: &mut Interpreter) -> PsResult<()> {
    let name = interp.pop_name()?;
    let file = interp.pop_file()?;

    if name.as_bytes() != b"ASCII85Decode" {
        log::warn!("unsupported filter {:?}", name);
        anyhow::bail!(PostScriptError::Unregistered);
    }

    let index = interp.files.insert(PsFile::ascii85(file));
    interp.push(Object::literal(Value::File(index)));

    Ok(())
}

/// Executes a named file from the file system
pub(crate) fn run_file(interp: &mut Interpreter) -> PsResult<()> {
    let name_slice = interp.pop_string()?;

    let name_bytes = interp.string_bytes(name_slice)?;
    let name = String::from_utf8_lossy(&name_bytes).into_owned();

    let contents = interp.file_system.get_file(&name)?.to_vec();
    let index = interp.files.insert(PsFile::memory(&name, contents));

    interp.push_execution_item(ExecutionItem::Object(Object::executable(Value::File(
        index,
    ))))
}

pub(crate) fn flush(_interp: &mut Interpreter) -> PsResult<()> {
    Ok(())
}

/// `file token`: scan one object; pushes `object true` or `false` at EOF
pub(crate) fn token_file(interp: &mut Interpreter) -> PsResult<()> {
    let file = interp.pop_file()?;

    match interp.read_object_from_file(file)? {
        Some(obj) => {
            interp.push(obj);
            interp.push(Object::boolean(true));
        }
        None => interp.push(Object::boolean(false)),
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use crate::{graphics::RecordingDevice, interpreter::Interpreter, object::Object};

    fn run(source: &[u8]) -> (Vec<Object>, Vec<u8>) {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(source, &mut device);

        interp.run().unwrap();

        let stdout = interp.stdout().to_vec();
        (interp.operand_stack.clone(), stdout)
    }

    #[test]
    fn verbose_print_forms() {
        let (_, out) = run(b"[1 2.5 (s) /n] ==");
        assert_eq!(out, b"[1 2.5 (s) /n]\n");

        let (_, out) = run(b"{ 1 add } ==");
        assert_eq!(out, b"{1 add}\n");

        let (_, out) = run(b"mark ==");
        assert_eq!(out, b"-mark-\n");
    }

    #[test]
    fn stack_prints_without_consuming() {
        let (stack, out) = run(b"1 2 stack");

        assert_eq!(stack, vec![Object::integer(1), Object::integer(2)]);
        assert_eq!(out, b"2\n1\n");
    }

    #[test]
    fn currentfile_token_reads_ahead() {
        // `token` consumes the 42 before normal execution sees it
        let (stack, _) = run(b"currentfile token 42");

        assert_eq!(stack, vec![Object::integer(42), Object::boolean(true)]);
    }

    #[test]
    fn currentfile_readline_consumes_rest_of_line() {
        let (stack, _) = run(b"currentfile 20 string readline not-scanned\n7");

        assert_eq!(stack.len(), 3);
        assert_eq!(stack[2], Object::integer(7));
    }

    #[test]
    fn write_to_stdout_file() {
        let (_, out) = run(b"(%stdout) (w) file dup 65 write dup (BC) writestring (\\015) writehexstring");

        assert_eq!(out, b"ABC0d");
    }

    #[test]
    fn readstring_from_named_file() {
        let (stack, _) = run(
            b"/fs (init.ps) (r) file def
              fs 4 string readstring",
        );

        assert_eq!(stack.len(), 2);
        assert_eq!(stack[1], Object::boolean(true));
    }

    #[test]
    fn missing_file_is_undefinedfilename() {
        let mut device = RecordingDevice::new();
        let mut interp = Interpreter::new(b"(nope.ps) run", &mut device);

        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<crate::error::PostScriptError>()
                .unwrap()
                .name(),
            "undefinedfilename"
        );
    }

    #[test]
    fn ascii85_filter_decodes_inline_data() {
        // the buffer is oversized so the filter reads through the `~>`
        // terminator, leaving the program file clean after the data
        let mut device = crate::graphics::RecordingDevice::new();
        let mut interp = crate::interpreter::Interpreter::new(
            b"currentfile /ASCII85Decode filter 30 string readstring\n9jqo^BlbD-BleB1DJ+*+F(f,q~>",
            &mut device,
        );

        interp.run().unwrap();

        assert_eq!(interp.operand_stack.len(), 2);
        assert_eq!(interp.operand_stack[1], Object::boolean(false));

        let crate::object::Value::String(decoded) = interp.operand_stack[0].value else {
            panic!("expected decoded string");
        };
        assert_eq!(
            interp.string_bytes(decoded).unwrap(),
            b"Man is distinguished"
        );
    }

    #[test]
    fn unknown_filter_is_unregistered() {
        let mut device = RecordingDevice::new();
        let mut interp =
            Interpreter::new(b"currentfile /DCTDecode filter", &mut device);

        let err = interp.run().unwrap_err();
        assert_eq!(
            err.downcast::<crate::error::PostScriptError>()
                .unwrap()
                .name(),
            "unregistered"
        );
    }
}
