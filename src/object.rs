//! The runtime object model: tagged objects with attributes, and the shared
//! composite containers (arrays, strings, dictionaries) they reference.
//!
//! Composite objects live in per-interpreter arenas and are referenced by
//! copyable indices; an array or string object additionally carries a
//! `(start, len)` window so `getinterval` views share storage with their
//! parent.

use std::{
    cmp::Ordering,
    collections::HashMap,
    fmt,
    hash::Hash,
    ops::BitOr,
};

use indexmap::IndexMap;

use crate::error::{PostScriptError, PsResult};

/// One bit per object type so operator signatures can accept unions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMask(pub u16);

impl TypeMask {
    pub const BOOLEAN: TypeMask = TypeMask(1 << 0);
    pub const FONT_ID: TypeMask = TypeMask(1 << 1);
    pub const INTEGER: TypeMask = TypeMask(1 << 2);
    pub const MARK: TypeMask = TypeMask(1 << 3);
    pub const NAME: TypeMask = TypeMask(1 << 4);
    pub const NULL: TypeMask = TypeMask(1 << 5);
    pub const OPERATOR: TypeMask = TypeMask(1 << 6);
    pub const REAL: TypeMask = TypeMask(1 << 7);
    pub const ARRAY: TypeMask = TypeMask(1 << 8);
    pub const DICTIONARY: TypeMask = TypeMask(1 << 9);
    pub const FILE: TypeMask = TypeMask(1 << 10);
    pub const GSTATE: TypeMask = TypeMask(1 << 11);
    pub const PACKED_ARRAY: TypeMask = TypeMask(1 << 12);
    pub const SAVE: TypeMask = TypeMask(1 << 13);
    pub const STRING: TypeMask = TypeMask(1 << 14);

    /// Matches every type
    pub const ANY: TypeMask = TypeMask(u16::MAX);

    pub const NUMERIC: TypeMask = TypeMask::INTEGER.union(TypeMask::REAL);

    pub const fn union(self, other: TypeMask) -> TypeMask {
        TypeMask(self.0 | other.0)
    }

    pub fn matches(self, other: TypeMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for TypeMask {
    type Output = TypeMask;

    fn bitor(self, other: TypeMask) -> TypeMask {
        self.union(other)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Access {
    /// Normally, objects have unlimited access: all operations defined for
    /// that object are allowed
    #[default]
    Unlimited,

    /// An object with read-only access may not have its value written, but may
    /// still be read or executed
    ReadOnly,

    /// An object with execute-only access may not have its value either read
    /// or written, but may still be executed by the PostScript interpreter
    ExecuteOnly,

    /// An object with no access may not be operated on in any way by a
    /// PostScript language program
    None,
}

impl Access {
    pub fn readable(self) -> bool {
        matches!(self, Self::Unlimited | Self::ReadOnly)
    }

    pub fn writable(self) -> bool {
        matches!(self, Self::Unlimited)
    }

    pub fn executable(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// An interned textual name. Names compare, hash, and act as dictionary keys
/// by their byte content
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name {
    bytes: Vec<u8>,
}

impl Name {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn new(name: &str) -> Self {
        Self::from_bytes(name.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", String::from_utf8_lossy(&self.bytes))
    }
}

/// A built-in operator. The name indexes the process-wide binding table; two
/// operator objects are the same operator iff they share a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    pub name: &'static str,
}

/// A window into an arena-stored array. Slices of the same array share
/// storage, so interior mutation through one view is visible through all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySlice {
    pub index: ArrayIndex,
    pub start: usize,
    pub len: usize,
}

impl ArraySlice {
    pub fn subslice(self, start: usize, len: usize) -> Self {
        Self {
            index: self.index,
            start: self.start + start,
            len,
        }
    }
}

/// A window into an arena-stored string buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringSlice {
    pub index: StringIndex,
    pub start: usize,
    pub len: usize,
}

impl StringSlice {
    pub fn subslice(self, start: usize, len: usize) -> Self {
        Self {
            index: self.index,
            start: self.start + start,
            len,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Boolean(bool),
    FontId(i64),
    Integer(i64),
    Mark,
    Name(Name),
    Null,
    Operator(Operator),
    Real(f64),
    Array(ArraySlice),
    Dictionary(DictionaryIndex),
    File(FileIndex),
    Save,
    String(StringSlice),
}

/// Every value manipulated at runtime: a type-tagged payload plus the
/// executability attribute. Access control lives with the shared container
/// value, as PLRM prescribes for composites
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub executable: bool,
    pub value: Value,
}

impl Object {
    pub fn literal(value: Value) -> Self {
        Self {
            executable: false,
            value,
        }
    }

    pub fn executable(value: Value) -> Self {
        Self {
            executable: true,
            value,
        }
    }

    pub fn integer(n: i64) -> Self {
        Self::literal(Value::Integer(n))
    }

    /// Integer truncates on creation from a real quantity
    pub fn integer_from_real(r: f64) -> PsResult<Self> {
        if !r.is_finite() || r.trunc() < i64::MIN as f64 || r.trunc() > i64::MAX as f64 {
            anyhow::bail!(PostScriptError::RangeCheck);
        }

        Ok(Self::integer(r.trunc() as i64))
    }

    pub fn real(r: f64) -> Self {
        Self::literal(Value::Real(r))
    }

    pub fn boolean(b: bool) -> Self {
        Self::literal(Value::Boolean(b))
    }

    pub fn mark() -> Self {
        Self::literal(Value::Mark)
    }

    pub fn null() -> Self {
        Self::literal(Value::Null)
    }

    pub fn literal_name(name: Name) -> Self {
        Self::literal(Value::Name(name))
    }

    pub fn executable_name(name: Name) -> Self {
        Self::executable(Value::Name(name))
    }

    pub fn type_mask(&self) -> TypeMask {
        match &self.value {
            Value::Boolean(..) => TypeMask::BOOLEAN,
            Value::FontId(..) => TypeMask::FONT_ID,
            Value::Integer(..) => TypeMask::INTEGER,
            Value::Mark => TypeMask::MARK,
            Value::Name(..) => TypeMask::NAME,
            Value::Null => TypeMask::NULL,
            Value::Operator(..) => TypeMask::OPERATOR,
            Value::Real(..) => TypeMask::REAL,
            Value::Array(..) => TypeMask::ARRAY,
            Value::Dictionary(..) => TypeMask::DICTIONARY,
            Value::File(..) => TypeMask::FILE,
            Value::Save => TypeMask::SAVE,
            Value::String(..) => TypeMask::STRING,
        }
    }

    /// The `type` operator's name for this object
    pub fn type_name(&self) -> &'static str {
        match &self.value {
            Value::Boolean(..) => "booleantype",
            Value::FontId(..) => "fonttype",
            Value::Integer(..) => "integertype",
            Value::Mark => "marktype",
            Value::Name(..) => "nametype",
            Value::Null => "nulltype",
            Value::Operator(..) => "operatortype",
            Value::Real(..) => "realtype",
            Value::Array(..) => "arraytype",
            Value::Dictionary(..) => "dicttype",
            Value::File(..) => "filetype",
            Value::Save => "savetype",
            Value::String(..) => "stringtype",
        }
    }

    /// A procedure is an executable array
    pub fn is_procedure(&self) -> bool {
        self.executable && matches!(self.value, Value::Array(..))
    }

    pub fn is_number(&self) -> bool {
        matches!(self.value, Value::Integer(..) | Value::Real(..))
    }
}

/// Keys hash by payload value: the name `/x`, the executable name `x`, and
/// the string `(x)` are the same key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum DictKey {
    Name(Name),
    Integer(i64),
    /// Bit pattern of the real, so the key is hashable
    Real(u64),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone)]
pub(crate) struct PsDictionary {
    entries: IndexMap<DictKey, Object>,
    access: Access,
    capacity: usize,
}

impl PsDictionary {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
            access: Access::default(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn set_access(&mut self, access: Access) {
        self.access = access;
    }

    pub fn get(&self, key: &DictKey) -> Option<&Object> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &DictKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Fails with `dictfull` when the dictionary is at capacity and the key
    /// is new. Overwriting an existing key always succeeds
    pub fn insert(&mut self, key: DictKey, value: Object) -> PsResult<()> {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            anyhow::bail!(PostScriptError::DictFull);
        }

        self.entries.insert(key, value);

        Ok(())
    }

    /// Bypasses the capacity check, for system bootstrap
    pub fn force_insert(&mut self, key: DictKey, value: Object) {
        self.entries.insert(key, value);
        self.capacity = usize::max(self.capacity, self.entries.len());
    }

    pub fn remove(&mut self, key: &DictKey) {
        self.entries.shift_remove(key);
    }

    pub fn entries(&self) -> impl Iterator<Item = (&DictKey, &Object)> {
        self.entries.iter()
    }

    /// True iff this dictionary looks like a font: it defines `FontType`,
    /// `FontName`, and `FontMatrix`
    pub fn is_font_dictionary(&self) -> bool {
        [&b"FontType"[..], b"FontName", b"FontMatrix"]
            .iter()
            .all(|key| self.contains(&DictKey::Name(Name::from_bytes(key.to_vec()))))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PsArray {
    elems: Vec<Object>,
    access: Access,
}

impl PsArray {
    pub fn from_objects(elems: Vec<Object>) -> Self {
        Self {
            elems,
            access: Access::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn set_access(&mut self, access: Access) {
        self.access = access;
    }

    pub fn get(&self, idx: usize) -> PsResult<&Object> {
        self.elems
            .get(idx)
            .ok_or(anyhow::anyhow!(PostScriptError::RangeCheck))
    }

    pub fn put(&mut self, idx: usize, obj: Object) -> PsResult<()> {
        match self.elems.get_mut(idx) {
            Some(slot) => {
                *slot = obj;
                Ok(())
            }
            None => anyhow::bail!(PostScriptError::RangeCheck),
        }
    }

    pub fn as_slice(&self) -> &[Object] {
        &self.elems
    }

    pub fn as_mut_slice(&mut self) -> &mut [Object] {
        &mut self.elems
    }
}

/// A fixed-length mutable byte buffer. Fresh strings are zero-initialized
#[derive(Clone)]
pub(crate) struct PsString {
    bytes: Vec<u8>,
    access: Access,
}

impl PsString {
    pub fn with_len(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
            access: Access::default(),
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            access: Access::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn set_access(&mut self, access: Access) {
        self.access = access;
    }

    pub fn get(&self, idx: usize) -> PsResult<u8> {
        self.bytes
            .get(idx)
            .copied()
            .ok_or(anyhow::anyhow!(PostScriptError::RangeCheck))
    }

    pub fn put(&mut self, idx: usize, byte: u8) -> PsResult<()> {
        match self.bytes.get_mut(idx) {
            Some(slot) => {
                *slot = byte;
                Ok(())
            }
            None => anyhow::bail!(PostScriptError::RangeCheck),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}

impl PartialEq for PsString {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.eq(&other.bytes)
    }
}

impl Eq for PsString {}

impl PartialOrd for PsString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PsString {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl fmt::Debug for PsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.bytes))
    }
}

pub(crate) trait Increment: fmt::Debug + Eq + Hash + Copy {
    /// Initial value
    fn init() -> Self;

    /// Increments self by 1. Returns previous value
    fn increment(&mut self) -> Self;
}

macro_rules! index {
    ($name:ident) => {
        #[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
        pub struct $name(pub(crate) usize);

        impl Increment for $name {
            fn init() -> Self {
                Self(0)
            }

            fn increment(&mut self) -> Self {
                let prev = self.0;

                self.0 += 1;

                Self(prev)
            }
        }
    };
}

index!(ArrayIndex);
index!(StringIndex);
index!(DictionaryIndex);
index!(FileIndex);

/// Arena of composite values. Objects reference entries by index, which gives
/// PostScript's shared-reference semantics without lifetimes in the object
/// graph
#[derive(Debug)]
pub(crate) struct Container<K: Increment, V> {
    map: HashMap<K, V>,
    counter: K,
}

impl<K: Increment, V> Container<K, V> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            counter: K::init(),
        }
    }

    pub fn insert(&mut self, v: V) -> K {
        let idx = self.counter.increment();

        self.map.insert(idx, v);

        idx
    }

    pub fn get(&self, k: &K) -> Option<&V> {
        self.map.get(k)
    }

    pub fn get_mut(&mut self, k: &K) -> Option<&mut V> {
        self.map.get_mut(k)
    }

    /// Removes the entry so the caller can operate on it while the arena is
    /// borrowed elsewhere. Pair with `restore`
    pub fn take(&mut self, k: &K) -> Option<V> {
        self.map.remove(k)
    }

    pub fn restore(&mut self, k: K, v: V) {
        self.map.insert(k, v);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dictionary_full_only_for_new_keys() {
        let mut dict = PsDictionary::new(2);

        dict.insert(DictKey::Name(Name::new("a")), Object::integer(1))
            .unwrap();
        dict.insert(DictKey::Name(Name::new("b")), Object::integer(2))
            .unwrap();

        assert!(dict
            .insert(DictKey::Name(Name::new("c")), Object::integer(3))
            .is_err());

        // overwriting an existing key succeeds at capacity
        dict.insert(DictKey::Name(Name::new("a")), Object::integer(9))
            .unwrap();
        assert_eq!(
            dict.get(&DictKey::Name(Name::new("a"))),
            Some(&Object::integer(9))
        );
    }

    #[test]
    fn font_dictionary_predicate() {
        let mut dict = PsDictionary::new(8);

        for key in ["FontType", "FontName", "FontMatrix"] {
            assert!(!dict.is_font_dictionary());
            dict.insert(DictKey::Name(Name::new(key)), Object::integer(0))
                .unwrap();
        }

        assert!(dict.is_font_dictionary());
    }

    #[test]
    fn string_is_zero_initialized() {
        let s = PsString::with_len(4);

        assert_eq!(s.as_bytes(), &[0, 0, 0, 0]);
    }

    #[test]
    fn string_put_range_checked() {
        let mut s = PsString::with_len(2);

        s.put(1, 0xFF).unwrap();
        assert!(s.put(2, 0).is_err());
    }

    #[test]
    fn type_masks_are_disjoint() {
        let masks = [
            TypeMask::BOOLEAN,
            TypeMask::FONT_ID,
            TypeMask::INTEGER,
            TypeMask::MARK,
            TypeMask::NAME,
            TypeMask::NULL,
            TypeMask::OPERATOR,
            TypeMask::REAL,
            TypeMask::ARRAY,
            TypeMask::DICTIONARY,
            TypeMask::FILE,
            TypeMask::GSTATE,
            TypeMask::PACKED_ARRAY,
            TypeMask::SAVE,
            TypeMask::STRING,
        ];

        for (i, a) in masks.iter().enumerate() {
            assert!(a.matches(TypeMask::ANY));
            for (j, b) in masks.iter().enumerate() {
                assert_eq!(a.matches(*b), i == j);
            }
        }
    }

    #[test]
    fn numeric_mask_matches_both_number_types() {
        assert!(Object::integer(1).type_mask().matches(TypeMask::NUMERIC));
        assert!(Object::real(1.0).type_mask().matches(TypeMask::NUMERIC));
        assert!(!Object::boolean(true).type_mask().matches(TypeMask::NUMERIC));
    }

    #[test]
    fn container_hands_out_fresh_indices() {
        let mut arrays: Container<ArrayIndex, PsArray> = Container::new();

        let a = arrays.insert(PsArray::from_objects(vec![]));
        let b = arrays.insert(PsArray::from_objects(vec![Object::null()]));

        assert_ne!(a, b);
        assert_eq!(arrays.get(&a).unwrap().len(), 0);
        assert_eq!(arrays.get(&b).unwrap().len(), 1);
    }
}
