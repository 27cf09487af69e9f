//! File objects and the named in-memory file system.
//!
//! Three kinds of file back the `file`/`filter`/`currentfile` operators: a
//! CharStream-backed in-memory file (readable and a token source), a
//! write-only capture file used for `%stdout`, and an ASCII85 decode filter
//! layered over another file.

use std::collections::{HashMap, VecDeque};

use crate::{
    error::{PostScriptError, PsResult},
    lexer::Lexer,
    object::FileIndex,
};

/// PLRM access strings: `r`, `w`, `a`, `r+`, `w+`, `a+`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AccessMode {
    Read,
    Write,
    Append,
    ReadWrite,
    WriteRead,
    AppendRead,
}

impl AccessMode {
    pub fn parse(bytes: &[u8]) -> PsResult<Self> {
        Ok(match bytes {
            b"r" => Self::Read,
            b"w" => Self::Write,
            b"a" => Self::Append,
            b"r+" => Self::ReadWrite,
            b"w+" => Self::WriteRead,
            b"a+" => Self::AppendRead,
            _ => anyhow::bail!(PostScriptError::InvalidFileAccess),
        })
    }

    pub fn can_read(self) -> bool {
        matches!(
            self,
            Self::Read | Self::ReadWrite | Self::WriteRead | Self::AppendRead
        )
    }

    pub fn can_write(self) -> bool {
        !matches!(self, Self::Read)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum FileBody {
    /// Readable in-memory contents; doubles as a token source. Byte reads and
    /// token scans share one cursor
    Memory(Lexer),

    /// Write-only capture buffer (`%stdout`, `w`-mode files)
    Capture(Vec<u8>),

    /// ASCII85 decode filter over another file
    Ascii85Decode {
        source: FileIndex,
        decoded: VecDeque<u8>,
        eof: bool,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct PsFile {
    pub name: String,
    pub mode: AccessMode,
    pub body: FileBody,
    pub closed: bool,
}

impl PsFile {
    pub fn memory(name: &str, contents: Vec<u8>) -> Self {
        Self {
            name: name.to_owned(),
            mode: AccessMode::Read,
            body: FileBody::Memory(Lexer::new(contents)),
            closed: false,
        }
    }

    pub fn capture(name: &str, mode: AccessMode) -> Self {
        Self {
            name: name.to_owned(),
            mode,
            body: FileBody::Capture(Vec::new()),
            closed: false,
        }
    }

    pub fn ascii85(source: FileIndex) -> Self {
        Self {
            name: "%filter".to_owned(),
            mode: AccessMode::Read,
            body: FileBody::Ascii85Decode {
                source,
                decoded: VecDeque::new(),
                eof: false,
            },
            closed: false,
        }
    }

    pub fn lexer_mut(&mut self) -> Option<&mut Lexer> {
        match &mut self.body {
            FileBody::Memory(lexer) => Some(lexer),
            _ => None,
        }
    }

    pub fn is_at_eof(&mut self) -> bool {
        if self.closed {
            return true;
        }

        match &mut self.body {
            FileBody::Memory(lexer) => lexer.stream().at_end(),
            FileBody::Capture(..) => true,
            FileBody::Ascii85Decode { decoded, eof, .. } => decoded.is_empty() && *eof,
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> PsResult<()> {
        if self.closed || !self.mode.can_write() {
            anyhow::bail!(PostScriptError::InvalidAccess);
        }

        match &mut self.body {
            FileBody::Capture(buffer) => {
                buffer.extend_from_slice(bytes);
                Ok(())
            }
            _ => anyhow::bail!(PostScriptError::IoError),
        }
    }

    pub fn captured(&self) -> &[u8] {
        match &self.body {
            FileBody::Capture(buffer) => buffer,
            _ => &[],
        }
    }
}

/// Named in-memory files available to `file` and `run`
#[derive(Debug, Clone)]
pub(crate) struct FileSystem {
    files: HashMap<String, Vec<u8>>,
}

pub(crate) const INIT_PS: &str = include_str!("runtime/init.ps");
pub(crate) const MISC_PS: &str = include_str!("runtime/misc.ps");
pub(crate) const ERROR_PS: &str = include_str!("runtime/error.ps");

impl FileSystem {
    /// A file system preloaded with the standard library sources that run
    /// before the user program
    pub fn with_standard_library() -> Self {
        let mut fs = Self {
            files: HashMap::new(),
        };

        fs.add_file("init.ps", INIT_PS.as_bytes().to_vec());
        fs.add_file("misc.ps", MISC_PS.as_bytes().to_vec());
        fs.add_file("error.ps", ERROR_PS.as_bytes().to_vec());

        fs
    }

    pub fn add_file(&mut self, name: &str, contents: Vec<u8>) {
        self.files.insert(name.to_owned(), contents);
    }

    pub fn get_file(&self, name: &str) -> PsResult<&[u8]> {
        self.files
            .get(name)
            .map(Vec::as_slice)
            .ok_or(anyhow::anyhow!(PostScriptError::UndefinedFileName))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }
}

/// Decodes a full ASCII85 buffer: groups of 5 base-85 digits to 4 bytes, `z`
/// for four zero bytes, a partial final group of n digits yielding n − 1
/// bytes. The `<~`/`~>` frame must already be stripped
pub(crate) fn decode_ascii85(encoded: &[u8]) -> PsResult<Vec<u8>> {
    let mut decoded = Vec::with_capacity(encoded.len() / 5 * 4);
    let mut group = [0u8; 5];
    let mut count = 0;

    for &b in encoded {
        match b {
            b if b.is_ascii_whitespace() || b == b'\0' => {}
            b'z' if count == 0 => decoded.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[count] = b - b'!';
                count += 1;

                if count == 5 {
                    decoded.extend_from_slice(&decode_ascii85_group(&group)?);
                    count = 0;
                }
            }
            _ => anyhow::bail!(PostScriptError::IoError),
        }
    }

    if count > 0 {
        if count == 1 {
            // a single leftover digit cannot encode any bytes
            anyhow::bail!(PostScriptError::IoError);
        }

        // pad with the maximum digit and drop the padding bytes
        for slot in group.iter_mut().skip(count) {
            *slot = 84;
        }

        let bytes = decode_ascii85_group(&group)?;
        decoded.extend_from_slice(&bytes[..count - 1]);
    }

    Ok(decoded)
}

pub(crate) fn decode_ascii85_group(digits: &[u8; 5]) -> PsResult<[u8; 4]> {
    let mut n: u32 = 0;

    for &digit in digits {
        n = n
            .checked_mul(85)
            .and_then(|n| n.checked_add(u32::from(digit)))
            .ok_or(anyhow::anyhow!(PostScriptError::IoError))?;
    }

    Ok(n.to_be_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ascii85_decodes_known_vector() {
        assert_eq!(
            decode_ascii85(b"9jqo^BlbD-BleB1DJ+*+F(f,q").unwrap(),
            b"Man is distinguished"
        );
    }

    #[test]
    fn ascii85_z_shorthand() {
        assert_eq!(decode_ascii85(b"z").unwrap(), [0, 0, 0, 0]);
    }

    #[test]
    fn ascii85_partial_group() {
        // "Man s" encodes to 5 + 2 digits
        assert_eq!(decode_ascii85(b"9jqo^Er").unwrap(), b"Man s");
    }

    #[test]
    fn ascii85_rejects_lone_final_digit() {
        assert!(decode_ascii85(b"9jqo^F").is_err());
    }

    #[test]
    fn ascii85_rejects_invalid_digit() {
        assert!(decode_ascii85(b"9jq\x7Fo^").is_err());
    }

    #[test]
    fn access_mode_strings() {
        assert_eq!(AccessMode::parse(b"r").unwrap(), AccessMode::Read);
        assert_eq!(AccessMode::parse(b"r+").unwrap(), AccessMode::ReadWrite);
        assert_eq!(AccessMode::parse(b"a+").unwrap(), AccessMode::AppendRead);
        assert!(AccessMode::parse(b"x").is_err());

        assert!(!AccessMode::parse(b"r").unwrap().can_write());
        assert!(AccessMode::parse(b"w").unwrap().can_write());
        assert!(AccessMode::parse(b"w+").unwrap().can_read());
    }

    #[test]
    fn file_system_standard_library() {
        let fs = FileSystem::with_standard_library();

        assert!(fs.exists("init.ps"));
        assert!(fs.exists("misc.ps"));
        assert!(fs.exists("error.ps"));
        assert!(fs.get_file("no-such-file.ps").is_err());
    }

    #[test]
    fn capture_file_rejects_reads_and_accepts_writes() {
        let mut file = PsFile::capture("%stdout", AccessMode::Write);

        file.write_bytes(b"hi").unwrap();
        assert_eq!(file.captured(), b"hi");
        assert!(file.is_at_eof());
    }

    #[test]
    fn closed_file_rejects_writes() {
        let mut file = PsFile::capture("%stdout", AccessMode::Write);
        file.closed = true;

        assert!(file.write_bytes(b"hi").is_err());
    }
}
