//! Type signature and zero value translation
//!
//! Maps a resolved Go type to the C++ type expression naming it, and to the
//! literal used to zero-initialise a value of that type. Composite types have
//! no zero literal: their default constructor establishes the zero state.
//!
//! A named non-empty interface is an abstract C++ struct, so values of that
//! type are held through a pointer to it.

use crate::error::{CodegenError, CodegenResult};
use crate::session::Session;
use crate::utils::{namespace_name, sanitize_identifier};
use goxx_ast::{BasicKind, ChanDir, NamedType, ResolvedType, Signature, TypeId, TypeTable};

/// C++ type for a basic kind
pub fn basic_type_sig(kind: BasicKind) -> CodegenResult<&'static str> {
    let sig = match kind {
        BasicKind::Bool | BasicKind::UntypedBool => "bool",
        BasicKind::Int | BasicKind::Int64 | BasicKind::UntypedInt => "int64_t",
        BasicKind::Int8 => "int8_t",
        BasicKind::Int16 => "int16_t",
        BasicKind::Int32 | BasicKind::UntypedRune => "int32_t",
        BasicKind::Uint | BasicKind::Uint64 => "uint64_t",
        BasicKind::Uint8 => "uint8_t",
        BasicKind::Uint16 => "uint16_t",
        BasicKind::Uint32 => "uint32_t",
        BasicKind::Uintptr => "uintptr_t",
        BasicKind::Float32 => "float",
        BasicKind::Float64 | BasicKind::UntypedFloat => "double",
        BasicKind::String | BasicKind::UntypedString => "std::string",
        BasicKind::UnsafePointer | BasicKind::UntypedNil => "void*",
        BasicKind::Complex64 | BasicKind::Complex128 | BasicKind::UntypedComplex => {
            return Err(CodegenError::unsupported(format!("complex type {:?}", kind)))
        }
    };
    Ok(sig)
}

/// Zero literal for a basic kind
pub fn basic_nil_val(kind: BasicKind) -> CodegenResult<&'static str> {
    let zero = match kind {
        BasicKind::Bool | BasicKind::UntypedBool => "false",
        BasicKind::String | BasicKind::UntypedString => "\"\"",
        BasicKind::UnsafePointer | BasicKind::UntypedNil => "nullptr",
        BasicKind::Complex64 | BasicKind::Complex128 | BasicKind::UntypedComplex => {
            return Err(CodegenError::unsupported(format!("complex type {:?}", kind)))
        }
        _ => "0",
    };
    Ok(zero)
}

/// Rendered function signature pieces
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub result: String,
    /// (type, name) per parameter
    pub params: Vec<(String, String)>,
}

impl FunctionSig {
    pub fn params_decl(&self) -> String {
        self.params
            .iter()
            .map(|(ty, name)| format!("{} {}", ty, name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn param_names(&self) -> String {
        self.params
            .iter()
            .map(|(_, name)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn returns_void(&self) -> bool {
        self.result == "void"
    }
}

/// Translates types as seen from one package
#[derive(Debug, Clone, Copy)]
pub struct TypeTranslator<'a> {
    types: &'a TypeTable,
    /// `None` renders every name fully qualified (global scope)
    package: Option<&'a str>,
    hoist_map_values: bool,
}

impl<'a> TypeTranslator<'a> {
    pub fn new(types: &'a TypeTable, package: Option<&'a str>) -> Self {
        Self {
            types,
            package,
            hoist_map_values: true,
        }
    }

    pub fn with_map_hoisting(mut self, enabled: bool) -> Self {
        self.hoist_map_values = enabled;
        self
    }

    pub fn types(&self) -> &'a TypeTable {
        self.types
    }

    fn get(&self, id: TypeId) -> CodegenResult<&'a ResolvedType> {
        self.types
            .get(id)
            .ok_or_else(|| CodegenError::inconsistent(id, "type not in the type table"))
    }

    /// Reference to a named type from the current package
    pub fn named_ref(&self, named: &NamedType) -> String {
        let name = sanitize_identifier(&named.name);
        match self.package {
            Some(current) if current == named.package => name,
            _ => format!("{}::{}", namespace_name(&named.package), name),
        }
    }

    /// Whether values of a named type are emitted as a C++ struct
    pub fn is_struct_like(&self, id: TypeId) -> bool {
        match self.types.underlying(id) {
            Some(ResolvedType::Struct { .. }) | Some(ResolvedType::Basic { .. }) => true,
            Some(ResolvedType::Interface { methods }) => !methods.is_empty(),
            _ => false,
        }
    }

    /// Whether `id` is held through a pointer to an abstract contract struct
    pub fn is_contract_pointer(&self, id: TypeId) -> bool {
        matches!(self.types.get(id), Some(ResolvedType::Named(named)) if !named.is_error())
            && matches!(self.types.underlying(id), Some(ResolvedType::Interface { methods }) if !methods.is_empty())
    }

    pub fn type_sig(&self, session: &mut Session, id: TypeId) -> CodegenResult<String> {
        match self.get(id)? {
            ResolvedType::Basic { basic } => Ok(basic_type_sig(*basic)?.to_string()),
            ResolvedType::Struct { fields } => {
                let mut sig = String::from("struct {");
                for field in fields {
                    let ty = self.type_sig(session, field.ty)?;
                    let zero = self.nil_val(field.ty)?;
                    sig.push_str(&format!(" {} {}{{{}}};", ty, sanitize_identifier(&field.name), zero));
                }
                sig.push_str(" }");
                Ok(sig)
            }
            ResolvedType::Pointer { elem } => Ok(format!("{}*", self.type_sig(session, *elem)?)),
            ResolvedType::Slice { elem } => {
                Ok(format!("goxx::slice<{}>", self.type_sig(session, *elem)?))
            }
            ResolvedType::Array { elem, len } => {
                Ok(format!("std::array<{}, {}>", self.type_sig(session, *elem)?, len))
            }
            ResolvedType::Map { key, elem } => {
                let key = self.type_sig(session, *key)?;
                let value = self.map_value_sig(session, *elem)?;
                Ok(format!("std::map<{}, {}>", key, value))
            }
            ResolvedType::Chan { elem, dir } => Ok(format!(
                "goxx::channel<{}, {}, {}>",
                self.type_sig(session, *elem)?,
                dir.contains(ChanDir::SEND),
                dir.contains(ChanDir::RECV)
            )),
            ResolvedType::Interface { methods } => {
                if methods.is_empty() {
                    Ok("goxx::interface".to_string())
                } else {
                    Err(CodegenError::unsupported("non-empty interface literal type"))
                }
            }
            ResolvedType::Named(named) => self.named_sig(session, id, named),
            ResolvedType::Signature(sig) => {
                let rendered = self.function_sig(session, sig)?;
                let params = rendered
                    .params
                    .iter()
                    .map(|(ty, _)| ty.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                Ok(format!("std::function<{}({})>", rendered.result, params))
            }
            ResolvedType::Tuple { items } => Ok(items
                .iter()
                .map(|item| self.type_sig(session, *item))
                .collect::<CodegenResult<Vec<_>>>()?
                .join(", ")),
        }
    }

    fn named_sig(&self, session: &mut Session, id: TypeId, named: &NamedType) -> CodegenResult<String> {
        if named.is_error() {
            return Ok("goxx::error".to_string());
        }
        if self.is_contract_pointer(id) {
            return Ok(format!("{}*", self.named_ref(named)));
        }
        if self.package.is_none() && !self.is_struct_like(id) {
            // Aliases cannot be forward declared; spell out the structure.
            return self.type_sig(session, named.underlying);
        }
        Ok(self.named_ref(named))
    }

    fn map_value_sig(&self, session: &mut Session, elem: TypeId) -> CodegenResult<String> {
        let value = self.type_sig(session, elem)?;
        if !self.hoist_map_values || !value.contains('<') {
            return Ok(value);
        }
        let global = TypeTranslator {
            package: None,
            ..*self
        };
        let qualified = global.type_sig(session, elem)?;
        Ok(session.alias_for(&qualified))
    }

    /// Zero literal, or an empty string when default construction is the zero
    pub fn nil_val(&self, id: TypeId) -> CodegenResult<String> {
        match self.get(id)? {
            ResolvedType::Basic { basic } => Ok(basic_nil_val(*basic)?.to_string()),
            ResolvedType::Pointer { .. } | ResolvedType::Signature(_) => Ok("nullptr".to_string()),
            _ => Ok(String::new()),
        }
    }

    /// Expression producing the zero value of `id`
    pub fn zero_expr(&self, session: &mut Session, id: TypeId) -> CodegenResult<String> {
        let zero = self.nil_val(id)?;
        if !zero.is_empty() {
            if matches!(self.get(id)?, ResolvedType::Basic { basic } if basic.is_string()) {
                return Ok("std::string()".to_string());
            }
            return Ok(zero);
        }
        Ok(format!("{}{{}}", self.type_sig(session, id)?))
    }

    /// C++ result type for a list of Go results
    pub fn results_sig(&self, session: &mut Session, results: &[goxx_ast::Param]) -> CodegenResult<String> {
        match results {
            [] => Ok("void".to_string()),
            [single] => self.type_sig(session, single.ty),
            many => {
                let items = many
                    .iter()
                    .map(|p| self.type_sig(session, p.ty))
                    .collect::<CodegenResult<Vec<_>>>()?;
                Ok(format!("std::tuple<{}>", items.join(", ")))
            }
        }
    }

    pub fn function_sig(&self, session: &mut Session, sig: &Signature) -> CodegenResult<FunctionSig> {
        let result = self.results_sig(session, &sig.results)?;
        let params = sig
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let ty = self.type_sig(session, param.ty)?;
                let name = match param.name.as_deref() {
                    Some(name) if name != "_" && !name.is_empty() => sanitize_identifier(name),
                    _ => format!("_p{}", i),
                };
                Ok((ty, name))
            })
            .collect::<CodegenResult<Vec<_>>>()?;
        Ok(FunctionSig { result, params })
    }

    /// Signature behind a `Signature` type id
    pub fn signature(&self, id: TypeId) -> CodegenResult<&'a Signature> {
        self.types
            .signature(id)
            .ok_or_else(|| CodegenError::inconsistent(id, "expected a function signature"))
    }
}
