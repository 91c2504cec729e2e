//! Contract Descriptor
//!
//! A capability contract is first expressed as a [`ContractDefinition`]: the
//! raw member list, either generated by `#[contract]` or assembled at runtime.
//! [`describe`] validates it and produces the immutable
//! [`ContractDescriptor`], the ordered list of method signatures a proxy must
//! reproduce, each carrying the [`MethodId`] the dispatch path uses instead of
//! re-resolving by name.
//!
//! ## Example
//!
//! ```rust,ignore
//! let definition = ContractDefinition::new("Greeter")
//!     .add_method(
//!         MethodDefinition::new("greet")
//!             .with_param(ParameterDefinition::new("name", TypeInfo::string()))
//!             .returns(TypeInfo::string()),
//!     );
//! let descriptor = describe(&definition)?;
//! assert_eq!(descriptor.len(), 1);
//! ```

use std::fmt;

use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};

use crate::error::{ProxyError, ProxyResult};
use crate::reflect::marshal::ArgumentPack;
use crate::reflect::proxy::ProxyHandle;
use crate::value::Value;

// ============================================================================
// Type information
// ============================================================================

/// Type kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// No value (`()`)
    Unit,
    /// Boolean
    Bool,
    /// Any integer width
    Int,
    /// Any float width
    Float,
    /// Unicode scalar
    Char,
    /// String
    String,
    /// Byte buffer
    Bytes,
    /// Homogeneous sequence
    Array,
    /// Value or null
    Optional,
    /// Shared object reference
    Object,
    /// Accepts every value
    Any,
}

/// Runtime type information for parameters and return values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    /// Type kind
    pub kind: TypeKind,
    /// Type name
    pub name: String,
    /// Element type (for arrays and optionals)
    pub element_type: Option<Box<TypeInfo>>,
}

impl TypeInfo {
    /// Create a primitive type info
    pub fn primitive(kind: TypeKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_string(),
            element_type: None,
        }
    }

    /// The unit type
    pub fn unit() -> Self {
        Self::primitive(TypeKind::Unit, "()")
    }

    /// The string type
    pub fn string() -> Self {
        Self::primitive(TypeKind::String, "String")
    }

    /// The byte buffer type
    pub fn bytes() -> Self {
        Self::primitive(TypeKind::Bytes, "Bytes")
    }

    /// The dynamic type accepting any value
    pub fn any() -> Self {
        Self::primitive(TypeKind::Any, "Value")
    }

    /// A shared object of the named Rust type
    pub fn object(name: &str) -> Self {
        Self::primitive(TypeKind::Object, name)
    }

    /// Create an array type info
    pub fn array(element_type: TypeInfo) -> Self {
        Self {
            kind: TypeKind::Array,
            name: format!("Vec<{}>", element_type.name),
            element_type: Some(Box::new(element_type)),
        }
    }

    /// Check whether `Value::Null` is a valid value of this type
    pub fn is_nullable(&self) -> bool {
        matches!(self.kind, TypeKind::Optional | TypeKind::Any)
    }

    /// Create an optional type info
    pub fn optional(element_type: TypeInfo) -> Self {
        Self {
            kind: TypeKind::Optional,
            name: format!("Option<{}>", element_type.name),
            element_type: Some(Box::new(element_type)),
        }
    }

    /// Check whether a runtime value has a shape this type can be unpacked from
    ///
    /// This is a shape check only; integer range checks happen on unpack.
    pub fn accepts(&self, value: &Value) -> bool {
        match self.kind {
            TypeKind::Any => true,
            TypeKind::Unit => value.is_unit(),
            TypeKind::Bool => matches!(value, Value::Bool(_)),
            TypeKind::Int => value.is_integer(),
            TypeKind::Float => matches!(
                value,
                Value::F32(_) | Value::F64(_) | Value::I32(_) | Value::U32(_)
            ),
            TypeKind::Char => matches!(value, Value::Char(_)),
            TypeKind::String => matches!(value, Value::Str(_)),
            TypeKind::Bytes => matches!(value, Value::Bytes(_)),
            TypeKind::Array => match value {
                Value::Array(items) => match &self.element_type {
                    Some(element) => items.iter().all(|item| element.accepts(item)),
                    None => true,
                },
                _ => false,
            },
            TypeKind::Optional => match (&self.element_type, value) {
                (_, Value::Null) => true,
                (None, _) => true,
                // A present value of a nullable element travels as a 1-element array
                (Some(element), Value::Array(items)) if element.is_nullable() => {
                    items.len() == 1 && element.accepts(&items[0])
                }
                (Some(element), _) if element.is_nullable() => false,
                (Some(element), value) => element.accepts(value),
            },
            TypeKind::Object => match value {
                Value::Object(obj) => obj.type_name() == self.name,
                _ => false,
            },
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ============================================================================
// Definitions (input)
// ============================================================================

/// Parameter definition for method signatures
#[derive(Debug, Clone)]
pub struct ParameterDefinition {
    /// Parameter name
    pub name: String,
    /// Parameter type info
    pub type_info: TypeInfo,
}

impl ParameterDefinition {
    /// Create a new parameter definition
    pub fn new(name: &str, type_info: TypeInfo) -> Self {
        Self {
            name: name.to_string(),
            type_info,
        }
    }
}

/// Definition for a method declared by a contract
#[derive(Debug, Clone)]
pub struct MethodDefinition {
    /// Method name
    pub name: String,
    /// Parameter definitions in declaration order
    pub parameters: Vec<ParameterDefinition>,
    /// Return type info
    pub return_type: TypeInfo,
    /// Whether this is a static (receiver-less) method
    pub is_static: bool,
    /// Whether this is an async method
    pub is_async: bool,
}

impl MethodDefinition {
    /// Create a new method definition returning unit
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Vec::new(),
            return_type: TypeInfo::unit(),
            is_static: false,
            is_async: false,
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, param: ParameterDefinition) -> Self {
        self.parameters.push(param);
        self
    }

    /// Set return type
    pub fn returns(mut self, type_info: TypeInfo) -> Self {
        self.return_type = type_info;
        self
    }

    /// Mark as static method
    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark as async method
    pub fn as_async(mut self) -> Self {
        self.is_async = true;
        self
    }
}

/// Definition for a property member
#[derive(Debug, Clone)]
pub struct PropertyDefinition {
    /// Property name
    pub name: String,
    /// Property type info
    pub type_info: TypeInfo,
}

impl PropertyDefinition {
    /// Create a new property definition
    pub fn new(name: &str, type_info: TypeInfo) -> Self {
        Self {
            name: name.to_string(),
            type_info,
        }
    }
}

/// One member of a contract definition
#[derive(Debug, Clone)]
pub enum MemberDefinition {
    /// A method
    Method(MethodDefinition),
    /// A property (never expressible as a proxy call)
    Property(PropertyDefinition),
    /// An event (never expressible as a proxy call)
    Event(String),
}

/// Raw member list of a capability contract
#[derive(Debug, Clone)]
pub struct ContractDefinition {
    name: String,
    members: Vec<MemberDefinition>,
}

impl ContractDefinition {
    /// Create a new empty contract definition
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    /// Add a method member
    pub fn add_method(mut self, method: MethodDefinition) -> Self {
        self.members.push(MemberDefinition::Method(method));
        self
    }

    /// Add a property member
    pub fn add_property(mut self, property: PropertyDefinition) -> Self {
        self.members.push(MemberDefinition::Property(property));
        self
    }

    /// Add an event member
    pub fn add_event(mut self, name: &str) -> Self {
        self.members.push(MemberDefinition::Event(name.to_string()));
        self
    }

    /// Contract name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in declaration order
    pub fn members(&self) -> &[MemberDefinition] {
        &self.members
    }
}

// ============================================================================
// Identities
// ============================================================================

/// Fingerprint of a contract: SHA-256 over its name and method signatures
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractId([u8; 32]);

impl ContractId {
    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({})", hex::encode(self.0))
    }
}

/// Stable identity of one method within a contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId {
    contract: ContractId,
    slot: u16,
}

impl MethodId {
    /// Create a method identity
    pub fn new(contract: ContractId, slot: u16) -> Self {
        Self { contract, slot }
    }

    /// The contract this method belongs to
    pub fn contract(&self) -> ContractId {
        self.contract
    }

    /// Position of the method in the contract's declaration order
    pub fn slot(&self) -> u16 {
        self.slot
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.contract, self.slot)
    }
}

// ============================================================================
// Descriptor (output)
// ============================================================================

/// Parameter information for a described method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    /// Parameter name
    pub name: String,
    /// Parameter type info
    pub type_info: TypeInfo,
    /// Parameter index
    pub index: usize,
}

/// A method signature the proxy must reproduce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    id: MethodId,
    name: String,
    parameters: Vec<ParameterInfo>,
    return_type: TypeInfo,
}

impl MethodSignature {
    /// Method identity
    pub fn id(&self) -> MethodId {
        self.id
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    /// Declared return type
    pub fn return_type(&self) -> &TypeInfo {
        &self.return_type
    }

    /// Number of declared parameters
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    fn same_shape(&self, other: &MethodSignature) -> bool {
        self.name == other.name
            && self.parameters.len() == other.parameters.len()
            && self
                .parameters
                .iter()
                .zip(&other.parameters)
                .all(|(a, b)| a.type_info == b.type_info)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param.name, param.type_info)?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// Immutable, validated description of a capability contract
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    id: ContractId,
    name: String,
    methods: Vec<MethodSignature>,
    /// Method name to slots (several slots when overloaded)
    method_indices: FxHashMap<String, Vec<u16>>,
}

impl ContractDescriptor {
    /// Contract fingerprint
    pub fn id(&self) -> ContractId {
        self.id
    }

    /// Contract name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method signatures in declaration order
    pub fn methods(&self) -> &[MethodSignature] {
        &self.methods
    }

    /// Number of methods
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Check if the contract declares no methods
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Resolve a method identity against this contract
    pub fn method(&self, id: MethodId) -> Option<&MethodSignature> {
        if id.contract != self.id {
            return None;
        }
        self.methods.get(id.slot as usize)
    }

    /// Get a method by declaration position
    pub fn method_at(&self, slot: usize) -> Option<&MethodSignature> {
        self.methods.get(slot)
    }

    /// First method with the given name
    pub fn find(&self, name: &str) -> Option<&MethodSignature> {
        self.overloads(name).next()
    }

    /// All methods with the given name, in declaration order
    pub fn overloads<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a MethodSignature> + 'a {
        self.method_indices
            .get(name)
            .map(|slots| slots.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&slot| &self.methods[slot as usize])
    }

    /// Method names, in declaration order, without duplicates
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.methods.len());
        for method in &self.methods {
            if !names.contains(&method.name()) {
                names.push(method.name());
            }
        }
        names
    }
}

impl PartialEq for ContractDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ContractDescriptor {}

/// Validate a contract definition and produce its descriptor.
///
/// Fails with `UnsupportedContractKind` if the definition holds properties,
/// events, static or async methods, or two methods with identical
/// signatures. A definition without members yields an empty descriptor.
pub fn describe(definition: &ContractDefinition) -> ProxyResult<ContractDescriptor> {
    let contract = definition.name();
    let unsupported = |reason: String| ProxyError::UnsupportedContractKind {
        contract: contract.to_string(),
        reason,
    };

    let mut methods_in: Vec<&MethodDefinition> = Vec::new();
    for member in definition.members() {
        match member {
            MemberDefinition::Method(method) if method.is_static => {
                return Err(unsupported(format!(
                    "static method '{}' has no receiver to proxy",
                    method.name
                )));
            }
            MemberDefinition::Method(method) if method.is_async => {
                return Err(unsupported(format!(
                    "async method '{}' cannot be intercepted synchronously",
                    method.name
                )));
            }
            MemberDefinition::Method(method) => methods_in.push(method),
            MemberDefinition::Property(property) => {
                return Err(unsupported(format!(
                    "property '{}' is not expressible as a method call",
                    property.name
                )));
            }
            MemberDefinition::Event(name) => {
                return Err(unsupported(format!(
                    "event '{}' is not expressible as a method call",
                    name
                )));
            }
        }
    }

    let id = fingerprint(contract, &methods_in);

    let mut methods: Vec<MethodSignature> = Vec::with_capacity(methods_in.len());
    let mut method_indices: FxHashMap<String, Vec<u16>> = FxHashMap::default();
    for (index, method) in methods_in.into_iter().enumerate() {
        let slot = u16::try_from(index).map_err(|_| ProxyError::SynthesisFailure {
            contract: contract.to_string(),
            reason: format!("more than {} methods", u16::MAX as usize + 1),
        })?;

        let signature = MethodSignature {
            id: MethodId::new(id, slot),
            name: method.name.clone(),
            parameters: method
                .parameters
                .iter()
                .enumerate()
                .map(|(index, param)| ParameterInfo {
                    name: param.name.clone(),
                    type_info: param.type_info.clone(),
                    index,
                })
                .collect(),
            return_type: method.return_type.clone(),
        };

        if let Some(existing) = methods.iter().find(|m| m.same_shape(&signature)) {
            return Err(unsupported(format!("duplicate method signature {}", existing)));
        }

        method_indices
            .entry(signature.name.clone())
            .or_default()
            .push(slot);
        methods.push(signature);
    }

    Ok(ContractDescriptor {
        id,
        name: contract.to_string(),
        methods,
        method_indices,
    })
}

/// SHA-256 over the full member shape. Every string is length-prefixed and
/// every type is hashed with its kind and element type.
fn fingerprint(contract: &str, methods: &[&MethodDefinition]) -> ContractId {
    let mut hasher = Sha256::new();
    hash_str(&mut hasher, contract);
    hasher.update((methods.len() as u64).to_le_bytes());
    for method in methods {
        hash_str(&mut hasher, &method.name);
        hasher.update((method.parameters.len() as u64).to_le_bytes());
        for param in &method.parameters {
            hash_str(&mut hasher, &param.name);
            hash_type(&mut hasher, &param.type_info);
        }
        hash_type(&mut hasher, &method.return_type);
    }
    ContractId(hasher.finalize().into())
}

fn hash_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_type(hasher: &mut Sha256, type_info: &TypeInfo) {
    let tag: u8 = match type_info.kind {
        TypeKind::Unit => 0,
        TypeKind::Bool => 1,
        TypeKind::Int => 2,
        TypeKind::Float => 3,
        TypeKind::Char => 4,
        TypeKind::String => 5,
        TypeKind::Bytes => 6,
        TypeKind::Array => 7,
        TypeKind::Optional => 8,
        TypeKind::Object => 9,
        TypeKind::Any => 10,
    };
    hasher.update([tag]);
    hash_str(hasher, &type_info.name);
    match &type_info.element_type {
        Some(element) => {
            hasher.update([1]);
            hash_type(hasher, element);
        }
        None => hasher.update([0]),
    }
}

// ============================================================================
// Compile-time contracts
// ============================================================================

/// A capability contract backed by a Rust trait.
///
/// Implemented by `#[contract]` for `dyn Trait`. The generated code supplies
/// the definition, the target adapter that resolves a method identity against
/// a concrete target, and the constructor of the synthesized proxy type.
pub trait Contract: Send + Sync + 'static {
    /// The synthesized proxy type implementing the trait
    type Proxy: Send + Sync + 'static;

    /// Raw member list of the contract
    fn definition() -> ContractDefinition;

    /// Perform the typed call on `target` for the method `method` resolves to
    fn invoke_target(
        target: &Self,
        method: &MethodSignature,
        args: ArgumentPack,
    ) -> ProxyResult<Value>;

    /// Wrap a proxy handle in the synthesized proxy type
    fn into_proxy(handle: ProxyHandle) -> Self::Proxy;
}
