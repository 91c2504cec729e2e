//! Value: the uniform boxed representation used for generic dispatch
//!
//! Every argument and return value crossing the dispatch core is carried as a
//! [`Value`]. Value types are stored inline by value, owned buffers are
//! copied, and shared objects travel as reference-counted handles.
//!
//! # Representation
//!
//! ```text
//! Unit            ()             - "no return value" sentinel
//! Null                           - absent optional
//! Bool            bool
//! I32 / I64       i8..i64        - signed integers (narrow ints widen to i32)
//! U32 / U64       u8..u64, usize - unsigned integers
//! F32 / F64       f32 / f64      - raw IEEE 754, never re-rounded
//! Char            char
//! Str             String         - owned copy
//! Bytes           Bytes          - owned copy
//! Array           Vec<T>         - element-wise boxed
//! Object          Arc<T>         - shared reference, identity preserved
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Uniform, type-erased value passed through the dispatch core.
#[derive(Clone, Default)]
pub enum Value {
    /// Unit sentinel for methods without a return value
    #[default]
    Unit,
    /// Null (an absent optional)
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer
    I32(i32),
    /// 64-bit signed integer
    I64(i64),
    /// 32-bit unsigned integer
    U32(u32),
    /// 64-bit unsigned integer
    U64(u64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// Unicode scalar
    Char(char),
    /// Owned string
    Str(String),
    /// Owned byte buffer
    Bytes(Vec<u8>),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// Shared reference to an arbitrary object
    Object(ObjectRef),
}

impl Value {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Create the unit value
    #[inline]
    pub const fn unit() -> Self {
        Value::Unit
    }

    /// Create a null value
    #[inline]
    pub const fn null() -> Self {
        Value::Null
    }

    /// Create a boolean value
    #[inline]
    pub const fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    /// Create an i32 value
    #[inline]
    pub const fn i32(i: i32) -> Self {
        Value::I32(i)
    }

    /// Create an i64 value
    #[inline]
    pub const fn i64(i: i64) -> Self {
        Value::I64(i)
    }

    /// Create a u32 value
    #[inline]
    pub const fn u32(u: u32) -> Self {
        Value::U32(u)
    }

    /// Create a u64 value
    #[inline]
    pub const fn u64(u: u64) -> Self {
        Value::U64(u)
    }

    /// Create an f32 value
    #[inline]
    pub const fn f32(f: f32) -> Self {
        Value::F32(f)
    }

    /// Create an f64 value
    #[inline]
    pub const fn f64(f: f64) -> Self {
        Value::F64(f)
    }

    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Wrap a shared object
    pub fn object<T: Any + Send + Sync>(object: Arc<T>) -> Self {
        Value::Object(ObjectRef::new(object))
    }

    // ========================================================================
    // Type checks
    // ========================================================================

    /// Check if value is the unit sentinel
    #[inline]
    pub const fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    /// Check if value is null
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if value is any integer variant
    #[inline]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Value::I32(_) | Value::I64(_) | Value::U32(_) | Value::U64(_))
    }

    /// Check if value is a shared object reference
    #[inline]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    // ========================================================================
    // Extractors
    // ========================================================================

    /// Extract boolean value
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract i32 value
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract f64 value (only for the `F64` variant)
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            _ => None,
        }
    }

    /// Borrow string contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow array elements
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the object reference
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Any integer variant widened to i128, so range checks are exact
    pub(crate) fn as_integer(&self) -> Option<i128> {
        match self {
            Value::I32(i) => Some(i128::from(*i)),
            Value::I64(i) => Some(i128::from(*i)),
            Value::U32(u) => Some(i128::from(*u)),
            Value::U64(u) => Some(i128::from(*u)),
            _ => None,
        }
    }

    /// Get the runtime shape name, used in mismatch diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Char(_) => "char",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Object(obj) => obj.type_name(),
        }
    }
}

/// Floats compare by bit pattern so that a packed NaN equals its unpacked
/// self; objects compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U32(a), Value::U32(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a.to_bits() == b.to_bits(),
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "Value::Unit"),
            Value::Null => write!(f, "Value::Null"),
            Value::Bool(b) => write!(f, "Value::Bool({})", b),
            Value::I32(i) => write!(f, "Value::I32({})", i),
            Value::I64(i) => write!(f, "Value::I64({})", i),
            Value::U32(u) => write!(f, "Value::U32({})", u),
            Value::U64(u) => write!(f, "Value::U64({})", u),
            Value::F32(x) => write!(f, "Value::F32({})", x),
            Value::F64(x) => write!(f, "Value::F64({})", x),
            Value::Char(c) => write!(f, "Value::Char({:?})", c),
            Value::Str(s) => write!(f, "Value::Str({:?})", s),
            Value::Bytes(b) => write!(f, "Value::Bytes(len={})", b.len()),
            Value::Array(items) => f.debug_tuple("Value::Array").field(items).finish(),
            Value::Object(obj) => write!(f, "Value::Object({:?})", obj),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I32(i) => write!(f, "{}", i),
            Value::I64(i) => write!(f, "{}", i),
            Value::U32(u) => write!(f, "{}", u),
            Value::U64(u) => write!(f, "{}", u),
            Value::F32(x) => write!(f, "{}", x),
            Value::F64(x) => write!(f, "{}", x),
            Value::Char(c) => write!(f, "{}", c),
            Value::Str(s) => write!(f, "{}", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => write!(f, "<object {}>", obj.type_name()),
        }
    }
}

/// Shared, type-erased object reference.
///
/// Cloning the handle shares the underlying allocation, so a reference-typed
/// argument reaches the target as the very same object the caller passed.
#[derive(Clone)]
pub struct ObjectRef {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ObjectRef {
    /// Wrap a shared object
    pub fn new<T: Any + Send + Sync>(object: Arc<T>) -> Self {
        Self {
            inner: object,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Name of the wrapped Rust type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether the wrapped object is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Recover the typed handle, sharing the allocation
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {:p}", self.type_name, Arc::as_ptr(&self.inner))
    }
}
