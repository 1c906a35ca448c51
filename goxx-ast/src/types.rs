//! Resolved types
//!
//! Every type the front end resolved lives in a [`TypeTable`] arena and is
//! referenced by [`TypeId`]. Recursive named types are expressed through ids,
//! so a `Named` entry may (indirectly) refer back to itself.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into a [`TypeTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Predeclared basic kinds, including the untyped constant kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    String,
    UnsafePointer,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub const ALL: [BasicKind; 25] = [
        BasicKind::Bool,
        BasicKind::Int,
        BasicKind::Int8,
        BasicKind::Int16,
        BasicKind::Int32,
        BasicKind::Int64,
        BasicKind::Uint,
        BasicKind::Uint8,
        BasicKind::Uint16,
        BasicKind::Uint32,
        BasicKind::Uint64,
        BasicKind::Uintptr,
        BasicKind::Float32,
        BasicKind::Float64,
        BasicKind::Complex64,
        BasicKind::Complex128,
        BasicKind::String,
        BasicKind::UnsafePointer,
        BasicKind::UntypedBool,
        BasicKind::UntypedInt,
        BasicKind::UntypedRune,
        BasicKind::UntypedFloat,
        BasicKind::UntypedComplex,
        BasicKind::UntypedString,
        BasicKind::UntypedNil,
    ];

    pub fn is_complex(self) -> bool {
        matches!(
            self,
            BasicKind::Complex64 | BasicKind::Complex128 | BasicKind::UntypedComplex
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }
}

bitflags! {
    /// Channel direction
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ChanDir: u8 {
        const SEND = 0b01;
        const RECV = 0b10;
        const BOTH = Self::SEND.bits() | Self::RECV.bits();
    }
}

/// How a method takes its receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Receiver {
    ByRef,
    ByValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeId,
    #[serde(default)]
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    #[serde(default)]
    pub name: Option<String>,
    pub ty: TypeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    #[serde(default)]
    pub variadic: bool,
}

/// A method required by an interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    /// Always a `Signature` entry
    pub sig: TypeId,
}

/// A method declared on a named type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub sig: TypeId,
    pub receiver: Receiver,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedType {
    /// Declaring package; empty for the universe scope (`error`)
    pub package: String,
    pub name: String,
    pub underlying: TypeId,
    #[serde(default)]
    pub methods: Vec<Method>,
}

impl NamedType {
    /// The predeclared `error` contract
    pub fn is_error(&self) -> bool {
        self.package.is_empty() && self.name == "error"
    }

    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// A fully resolved type as produced by the type checker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedType {
    Basic { basic: BasicKind },
    Struct { fields: Vec<Field> },
    Interface { methods: Vec<MethodSig> },
    Named(NamedType),
    Pointer { elem: TypeId },
    Slice { elem: TypeId },
    Array { elem: TypeId, len: u64 },
    Map { key: TypeId, elem: TypeId },
    Chan { elem: TypeId, dir: ChanDir },
    Signature(Signature),
    Tuple { items: Vec<TypeId> },
}

impl ResolvedType {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResolvedType::Basic { .. } => "basic",
            ResolvedType::Struct { .. } => "struct",
            ResolvedType::Interface { .. } => "interface",
            ResolvedType::Named(_) => "named",
            ResolvedType::Pointer { .. } => "pointer",
            ResolvedType::Slice { .. } => "slice",
            ResolvedType::Array { .. } => "array",
            ResolvedType::Map { .. } => "map",
            ResolvedType::Chan { .. } => "chan",
            ResolvedType::Signature(_) => "signature",
            ResolvedType::Tuple { .. } => "tuple",
        }
    }

    /// Ids this type refers to directly
    pub fn children(&self) -> Vec<TypeId> {
        match self {
            ResolvedType::Basic { .. } => Vec::new(),
            ResolvedType::Struct { fields } => fields.iter().map(|f| f.ty).collect(),
            ResolvedType::Interface { methods } => methods.iter().map(|m| m.sig).collect(),
            ResolvedType::Named(named) => std::iter::once(named.underlying)
                .chain(named.methods.iter().map(|m| m.sig))
                .collect(),
            ResolvedType::Pointer { elem }
            | ResolvedType::Slice { elem }
            | ResolvedType::Array { elem, .. }
            | ResolvedType::Chan { elem, .. } => vec![*elem],
            ResolvedType::Map { key, elem } => vec![*key, *elem],
            ResolvedType::Signature(sig) => sig
                .params
                .iter()
                .chain(sig.results.iter())
                .map(|p| p.ty)
                .collect(),
            ResolvedType::Tuple { items } => items.clone(),
        }
    }
}

/// Arena of resolved types
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTable {
    types: Vec<ResolvedType>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ty: ResolvedType) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn get(&self, id: TypeId) -> Option<&ResolvedType> {
        self.types.get(id.index())
    }

    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut ResolvedType> {
        self.types.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &ResolvedType)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, ty)| (TypeId(i as u32), ty))
    }

    pub fn named(&self, id: TypeId) -> Option<&NamedType> {
        match self.get(id)? {
            ResolvedType::Named(named) => Some(named),
            _ => None,
        }
    }

    /// Follow `Named` links down to the structural type
    pub fn underlying(&self, id: TypeId) -> Option<&ResolvedType> {
        let mut current = id;
        // Named chains are finite; the bound guards against malformed input.
        for _ in 0..=self.types.len() {
            match self.get(current)? {
                ResolvedType::Named(named) => current = named.underlying,
                other => return Some(other),
            }
        }
        None
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.underlying(id), Some(ResolvedType::Interface { .. }))
    }

    pub fn is_empty_interface(&self, id: TypeId) -> bool {
        matches!(self.underlying(id), Some(ResolvedType::Interface { methods }) if methods.is_empty())
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.underlying(id), Some(ResolvedType::Pointer { .. }))
    }

    pub fn signature(&self, id: TypeId) -> Option<&Signature> {
        match self.underlying(id)? {
            ResolvedType::Signature(sig) => Some(sig),
            _ => None,
        }
    }
}

impl std::ops::Index<TypeId> for TypeTable {
    type Output = ResolvedType;

    fn index(&self, id: TypeId) -> &ResolvedType {
        &self.types[id.index()]
    }
}
