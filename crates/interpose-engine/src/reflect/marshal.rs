//! Argument Marshaler
//!
//! Converts statically typed call arguments into an [`ArgumentPack`] of
//! [`Value`]s and converts generic results back to the declared type.
//!
//! Conversions are exact. Lossless widenings are accepted on unpack
//! (`i32 -> i64`, `u32 -> u64`, `f32 -> f64`, 32-bit ints to `f64`); an
//! integer narrows only if it fits, otherwise the unpack fails with
//! `MarshalTypeMismatch`.

use std::any::Any;
use std::sync::Arc;

use crate::error::{ProxyError, ProxyResult};
use crate::reflect::contract::{MethodSignature, TypeInfo, TypeKind};
use crate::value::{ObjectRef, Value};

/// Conversion between a Rust type and the uniform [`Value`] representation
pub trait Marshal: Sized {
    /// Type information recorded in contract descriptors
    fn type_info() -> TypeInfo;

    /// Box the value into the uniform representation
    fn pack(self) -> Value;

    /// Convert a uniform value back to `Self`
    fn unpack(value: Value) -> ProxyResult<Self>;

    /// Whether some value of `Self` packs to `Value::Null`
    const NULLABLE: bool = false;
}

/// Pack a list of typed arguments, preserving declaration order
pub fn pack<A: PackArgs>(args: A) -> ArgumentPack {
    args.pack_args()
}

/// Convert a generic result back to the statically expected type
pub fn unpack<T: Marshal>(value: Value) -> ProxyResult<T> {
    T::unpack(value)
}

/// Ordered sequence of marshaled arguments, one per declared parameter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgumentPack {
    values: Vec<Value>,
}

impl ArgumentPack {
    /// Create an empty pack
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Create a pack from already boxed values
    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Number of arguments
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the pack holds no arguments
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Borrow the argument at a position
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Borrow all arguments
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consume the pack
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Append an argument
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Move the argument at `index` out of the pack and unpack it.
    ///
    /// The slot is left holding `Value::Unit`.
    pub fn take<T: Marshal>(&mut self, index: usize) -> ProxyResult<T> {
        let count = self.values.len();
        let slot = self.values.get_mut(index).ok_or_else(|| {
            ProxyError::mismatch(
                format!("argument {}", index),
                format!("{} arguments", count),
            )
        })?;
        T::unpack(std::mem::take(slot))
    }

    /// Validate arity and argument shapes against a signature
    pub fn check(&self, signature: &MethodSignature) -> ProxyResult<()> {
        if self.values.len() != signature.arity() {
            return Err(ProxyError::mismatch(
                format!("{} arguments for '{}'", signature.arity(), signature.name()),
                format!("{} arguments", self.values.len()),
            ));
        }
        for (param, value) in signature.parameters().iter().zip(&self.values) {
            if !param.type_info.accepts(value) {
                return Err(ProxyError::mismatch(
                    format!("{} for parameter '{}'", param.type_info, param.name),
                    value.type_name(),
                ));
            }
        }
        Ok(())
    }
}

impl From<Vec<Value>> for ArgumentPack {
    fn from(values: Vec<Value>) -> Self {
        Self::from_values(values)
    }
}

impl IntoIterator for ArgumentPack {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Argument lists that can be packed: tuples of [`Marshal`] types, boxed
/// value vectors, and packs themselves.
pub trait PackArgs {
    /// Pack into a uniform argument sequence
    fn pack_args(self) -> ArgumentPack;
}

impl PackArgs for ArgumentPack {
    fn pack_args(self) -> ArgumentPack {
        self
    }
}

impl PackArgs for Vec<Value> {
    fn pack_args(self) -> ArgumentPack {
        ArgumentPack::from_values(self)
    }
}

macro_rules! impl_pack_args {
    ($($name:ident),*) => {
        impl<$($name: Marshal),*> PackArgs for ($($name,)*) {
            #[allow(non_snake_case)]
            fn pack_args(self) -> ArgumentPack {
                let ($($name,)*) = self;
                ArgumentPack::from_values(vec![$($name.pack()),*])
            }
        }
    };
}

impl PackArgs for () {
    fn pack_args(self) -> ArgumentPack {
        ArgumentPack::new()
    }
}

impl_pack_args!(A);
impl_pack_args!(A, B);
impl_pack_args!(A, B, C);
impl_pack_args!(A, B, C, D);
impl_pack_args!(A, B, C, D, E);
impl_pack_args!(A, B, C, D, E, F);
impl_pack_args!(A, B, C, D, E, F, G);
impl_pack_args!(A, B, C, D, E, F, G, H);
impl_pack_args!(A, B, C, D, E, F, G, H, I);
impl_pack_args!(A, B, C, D, E, F, G, H, I, J);
impl_pack_args!(A, B, C, D, E, F, G, H, I, J, K);
impl_pack_args!(A, B, C, D, E, F, G, H, I, J, K, L);

// ============================================================================
// Marshal implementations
// ============================================================================

impl Marshal for Value {
    const NULLABLE: bool = true;

    fn type_info() -> TypeInfo {
        TypeInfo::any()
    }

    fn pack(self) -> Value {
        self
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        Ok(value)
    }
}

impl Marshal for () {
    fn type_info() -> TypeInfo {
        TypeInfo::unit()
    }

    fn pack(self) -> Value {
        Value::Unit
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        match value {
            Value::Unit => Ok(()),
            other => Err(ProxyError::mismatch("()", other.type_name())),
        }
    }
}

impl Marshal for bool {
    fn type_info() -> TypeInfo {
        TypeInfo::primitive(TypeKind::Bool, "bool")
    }

    fn pack(self) -> Value {
        Value::Bool(self)
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        value
            .as_bool()
            .ok_or_else(|| ProxyError::mismatch("bool", value.type_name()))
    }
}

impl Marshal for char {
    fn type_info() -> TypeInfo {
        TypeInfo::primitive(TypeKind::Char, "char")
    }

    fn pack(self) -> Value {
        Value::Char(self)
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        match value {
            Value::Char(c) => Ok(c),
            other => Err(ProxyError::mismatch("char", other.type_name())),
        }
    }
}

macro_rules! impl_marshal_int {
    ($ty:ty, $variant:ident, $wide:ty) => {
        impl Marshal for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::primitive(TypeKind::Int, stringify!($ty))
            }

            fn pack(self) -> Value {
                Value::$variant(<$wide>::from(self))
            }

            fn unpack(value: Value) -> ProxyResult<Self> {
                value
                    .as_integer()
                    .and_then(|i| <$ty>::try_from(i).ok())
                    .ok_or_else(|| ProxyError::mismatch(stringify!($ty), describe_shape(&value)))
            }
        }
    };
}

impl_marshal_int!(i8, I32, i32);
impl_marshal_int!(i16, I32, i32);
impl_marshal_int!(i32, I32, i32);
impl_marshal_int!(i64, I64, i64);
impl_marshal_int!(u8, U32, u32);
impl_marshal_int!(u16, U32, u32);
impl_marshal_int!(u32, U32, u32);
impl_marshal_int!(u64, U64, u64);

impl Marshal for usize {
    fn type_info() -> TypeInfo {
        TypeInfo::primitive(TypeKind::Int, "usize")
    }

    fn pack(self) -> Value {
        Value::U64(self as u64)
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        value
            .as_integer()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| ProxyError::mismatch("usize", describe_shape(&value)))
    }
}

impl Marshal for f64 {
    fn type_info() -> TypeInfo {
        TypeInfo::primitive(TypeKind::Float, "f64")
    }

    fn pack(self) -> Value {
        Value::F64(self)
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        match value {
            Value::F64(f) => Ok(f),
            Value::F32(f) => Ok(f64::from(f)),
            Value::I32(i) => Ok(f64::from(i)),
            Value::U32(u) => Ok(f64::from(u)),
            other => Err(ProxyError::mismatch("f64", other.type_name())),
        }
    }
}

impl Marshal for f32 {
    fn type_info() -> TypeInfo {
        TypeInfo::primitive(TypeKind::Float, "f32")
    }

    fn pack(self) -> Value {
        Value::F32(self)
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        match value {
            Value::F32(f) => Ok(f),
            // Only when the narrowing is exact
            Value::F64(f) if f64::from(f as f32).to_bits() == f.to_bits() => Ok(f as f32),
            other => Err(ProxyError::mismatch("f32", describe_shape(&other))),
        }
    }
}

impl Marshal for String {
    fn type_info() -> TypeInfo {
        TypeInfo::string()
    }

    fn pack(self) -> Value {
        Value::Str(self)
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(ProxyError::mismatch("String", other.type_name())),
        }
    }
}

/// Owned byte buffer, marshaled as `Value::Bytes` rather than an array of ints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Marshal for Bytes {
    fn type_info() -> TypeInfo {
        TypeInfo::bytes()
    }

    fn pack(self) -> Value {
        Value::Bytes(self.0)
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        match value {
            Value::Bytes(b) => Ok(Bytes(b)),
            other => Err(ProxyError::mismatch("Bytes", other.type_name())),
        }
    }
}

impl<T: Marshal> Marshal for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::array(T::type_info())
    }

    fn pack(self) -> Value {
        Value::Array(self.into_iter().map(Marshal::pack).collect())
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        match value {
            Value::Array(items) => items.into_iter().map(T::unpack).collect(),
            other => Err(ProxyError::mismatch(
                Self::type_info().name,
                other.type_name(),
            )),
        }
    }
}

/// `Some` of a nullable `T` (a nested `Option`, or `Value`) is wrapped in a
/// one-element array so it stays distinct from `None`.
impl<T: Marshal> Marshal for Option<T> {
    const NULLABLE: bool = true;

    fn type_info() -> TypeInfo {
        TypeInfo::optional(T::type_info())
    }

    fn pack(self) -> Value {
        match self {
            Some(value) if T::NULLABLE => Value::Array(vec![value.pack()]),
            Some(value) => value.pack(),
            None => Value::Null,
        }
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        match value {
            Value::Null => Ok(None),
            Value::Array(mut items) if T::NULLABLE && items.len() == 1 => {
                items.pop().map(T::unpack).transpose()
            }
            other if T::NULLABLE => Err(ProxyError::mismatch(
                Self::type_info().name,
                other.type_name(),
            )),
            other => T::unpack(other).map(Some),
        }
    }
}

impl<T: Any + Send + Sync> Marshal for Arc<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::object(std::any::type_name::<T>())
    }

    fn pack(self) -> Value {
        Value::Object(ObjectRef::new(self))
    }

    fn unpack(value: Value) -> ProxyResult<Self> {
        match &value {
            Value::Object(obj) => obj
                .downcast::<T>()
                .ok_or_else(|| ProxyError::mismatch(std::any::type_name::<T>(), obj.type_name())),
            other => Err(ProxyError::mismatch(
                std::any::type_name::<T>(),
                other.type_name(),
            )),
        }
    }
}

/// Shape plus payload for numeric mismatches, e.g. `i64(5000000000)`
fn describe_shape(value: &Value) -> String {
    match value {
        Value::I32(_) | Value::I64(_) | Value::U32(_) | Value::U64(_) | Value::F32(_) | Value::F64(_) => {
            format!("{}({})", value.type_name(), value)
        }
        other => other.type_name().to_string(),
    }
}
