//! Named type emission
//!
//! A declared type name becomes one of four C++ shapes, chosen by its
//! underlying kind:
//!
//! - struct: an aggregate deriving from every contract it satisfies
//! - interface: an abstract contract with one pure virtual per method
//! - basic: a `goxx::basic<T>` wrapper with the same base list as a struct
//! - array, slice, map and the rest: a plain `using` alias
//!
//! Struct and basic types also get an `is_zero` specialization and a
//! `try_downcast` registration. Both live at global scope and are returned
//! separately from the in-namespace declaration.

use crate::context::EmitContext;
use crate::emitter::CppEmitter;
use crate::error::{CodegenError, CodegenResult};
use crate::session::Session;
use crate::typesig::{basic_type_sig, FunctionSig};
use crate::utils::{namespace_name, sanitize_identifier};
use goxx_ast::{Field, Method, NamedType, Receiver, ResolvedType, TypeId};
use goxx_checker::method_set::contract_methods;
use goxx_checker::TypeFilter;
use tracing::debug;

/// How a method is laid out on its receiver type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodShape {
    /// Required by a contract, pointer receiver: out-of-line override
    Virtual,
    /// Required by a contract, value receiver: inline override forwarding to
    /// the by-value implementation on a copy
    VirtualByValue,
    /// Not required, pointer receiver
    Plain,
    /// Not required, value receiver: the body works on a copy
    PlainByValue,
}

impl MethodShape {
    pub fn is_virtual(self) -> bool {
        matches!(self, MethodShape::Virtual | MethodShape::VirtualByValue)
    }
}

/// Whether any contract satisfied by `owner` requires `method`
pub fn is_required(cx: &EmitContext<'_>, owner: TypeId, method: &str) -> bool {
    cx.index
        .satisfied_interfaces(owner)
        .iter()
        .any(|&contract| {
            contract_methods(cx.types(), contract)
                .iter()
                .any(|m| m.name == method)
        })
}

pub fn method_shape(cx: &EmitContext<'_>, owner: TypeId, method: &Method) -> MethodShape {
    match (is_required(cx, owner, &method.name), method.receiver) {
        (true, Receiver::ByRef) => MethodShape::Virtual,
        (true, Receiver::ByValue) => MethodShape::VirtualByValue,
        (false, Receiver::ByRef) => MethodShape::Plain,
        (false, Receiver::ByValue) => MethodShape::PlainByValue,
    }
}

/// Name of the ordinary member holding a by-value override's logic
pub fn by_value_name(method: &str) -> String {
    format!("_{}ByValue", method)
}

/// Output for one named type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedTypeDecl {
    /// Declaration inside the package namespace
    pub decl: String,
    /// Specializations at global scope
    pub global: String,
}

/// Emits one named type
pub struct NamedTypeEmitter<'a, 's> {
    cx: EmitContext<'a>,
    session: &'s mut Session,
}

impl<'a, 's> NamedTypeEmitter<'a, 's> {
    pub fn new(cx: EmitContext<'a>, session: &'s mut Session) -> Self {
        Self { cx, session }
    }

    pub fn emit(&mut self, id: TypeId) -> CodegenResult<NamedTypeDecl> {
        let named = self
            .cx
            .types()
            .named(id)
            .ok_or_else(|| CodegenError::inconsistent(id, "declared type is not named"))?;
        let underlying = self
            .cx
            .types()
            .underlying(id)
            .ok_or_else(|| CodegenError::inconsistent(id, "named type has no underlying type"))?;
        debug!(name = %named.qualified_name(), kind = underlying.kind_name(), "emitting named type");

        match underlying {
            ResolvedType::Struct { fields } => self.emit_struct(id, named, fields),
            ResolvedType::Interface { methods } if !methods.is_empty() => {
                self.emit_interface(id, named)
            }
            ResolvedType::Basic { basic } => {
                let value = basic_type_sig(*basic)?;
                self.emit_basic(id, named, value)
            }
            other => {
                if let Some(method) = named.methods.first() {
                    return Err(CodegenError::unsupported(format!(
                        "method `{}` on {} type `{}`",
                        method.name,
                        other.kind_name(),
                        named.name
                    )));
                }
                let sig = self.cx.type_sig(self.session, named.underlying)?;
                Ok(NamedTypeDecl {
                    decl: format!("using {} = {};\n", sanitize_identifier(&named.name), sig),
                    global: String::new(),
                })
            }
        }
    }

    fn emitter(&self) -> CppEmitter {
        CppEmitter::new(self.cx.config.indent_width)
    }

    fn qualified(&self, named: &NamedType) -> String {
        format!(
            "{}::{}",
            namespace_name(&named.package),
            sanitize_identifier(&named.name)
        )
    }

    /// `: public I1, public I2` for every satisfied contract
    fn base_list(&self, id: TypeId, first: Option<String>) -> String {
        let translator = self.cx.translator();
        let bases: Vec<String> = first
            .into_iter()
            .chain(
                self.cx
                    .index
                    .satisfied_interfaces(id)
                    .iter()
                    .filter_map(|&c| self.cx.types().named(c))
                    .map(|c| format!("public {}", translator.named_ref(c))),
            )
            .collect();
        if bases.is_empty() {
            String::new()
        } else {
            format!(" : {}", bases.join(", "))
        }
    }

    fn emit_struct(&mut self, id: TypeId, named: &NamedType, fields: &[Field]) -> CodegenResult<NamedTypeDecl> {
        let name = sanitize_identifier(&named.name);
        let mut out = self.emitter();
        out.emit_line(&format!("struct {}{} {{", name, self.base_list(id, None)));
        out.indent();
        for field in fields {
            let ty = self.cx.type_sig(self.session, field.ty)?;
            let zero = self.cx.nil_val(field.ty)?;
            out.emit_line(&format!("{} {}{{{}}};", ty, sanitize_identifier(&field.name), zero));
        }
        self.emit_methods(&mut out, id, named, !fields.is_empty())?;
        out.dedent();
        out.emit_line("};");

        let field_names: Vec<String> = fields
            .iter()
            .map(|f| format!("v.{}", sanitize_identifier(&f.name)))
            .collect();
        let mut global = self.zero_predicate(named, &field_names);
        global.push_str(&self.register_downcast(id, named));
        Ok(NamedTypeDecl {
            decl: out.finish(),
            global,
        })
    }

    fn emit_basic(&mut self, id: TypeId, named: &NamedType, value: &str) -> CodegenResult<NamedTypeDecl> {
        let name = sanitize_identifier(&named.name);
        let adapter = format!("goxx::basic<{}>", value);
        let mut out = self.emitter();
        out.emit_line(&format!(
            "struct {}{} {{",
            name,
            self.base_list(id, Some(format!("public {}", adapter)))
        ));
        out.indent();
        out.emit_line(&format!("using {}::basic;", adapter));
        self.emit_methods(&mut out, id, named, true)?;
        out.dedent();
        out.emit_line("};");

        let mut global = self.zero_predicate(named, &["v.value".to_string()]);
        global.push_str(&self.register_downcast(id, named));
        Ok(NamedTypeDecl {
            decl: out.finish(),
            global,
        })
    }

    fn emit_interface(&mut self, id: TypeId, named: &NamedType) -> CodegenResult<NamedTypeDecl> {
        let name = sanitize_identifier(&named.name);
        let mut out = self.emitter();
        out.emit_line(&format!("struct {} : public virtual goxx::object {{", name));
        out.indent();
        let translator = self.cx.translator();
        for method in contract_methods(self.cx.types(), id) {
            let sig = translator.signature(method.sig)?;
            let rendered = translator.function_sig(self.session, sig)?;
            out.emit_line(&format!(
                "virtual {} {}({}) = 0;",
                rendered.result,
                sanitize_identifier(method.name),
                rendered.params_decl()
            ));
        }
        out.dedent();
        out.emit_line("};");

        let mut global = String::new();
        for concrete in self.cx.index.satisfying_types(id, TypeFilter::ConcreteOnly) {
            let Some(target) = self.cx.types().named(concrete) else {
                continue;
            };
            let struct_like = self.cx.translator().is_struct_like(concrete);
            if struct_like && self.cx.is_visible_package(&target.package) {
                global.push_str(&self.register_downcast(concrete, target));
            }
        }
        Ok(NamedTypeDecl {
            decl: out.finish(),
            global,
        })
    }

    fn emit_methods(
        &mut self,
        out: &mut CppEmitter,
        id: TypeId,
        named: &NamedType,
        separate: bool,
    ) -> CodegenResult<()> {
        if named.methods.is_empty() {
            return Ok(());
        }
        if separate {
            out.emit_line("");
        }
        let translator = self.cx.translator();
        let owner = sanitize_identifier(&named.name);
        for method in &named.methods {
            let sig = translator.signature(method.sig)?;
            let rendered: FunctionSig = translator.function_sig(self.session, sig)?;
            let name = sanitize_identifier(&method.name);
            let params = rendered.params_decl();
            match method_shape(&self.cx, id, method) {
                MethodShape::Virtual => {
                    out.emit_line(&format!("virtual {} {}({}) override;", rendered.result, name, params));
                }
                MethodShape::VirtualByValue => {
                    let forward = format!(
                        "_recv.{}({})",
                        by_value_name(&name),
                        rendered.param_names()
                    );
                    out.emit_line(&format!(
                        "virtual {} {}({}) override {{",
                        rendered.result, name, params
                    ));
                    out.indent();
                    out.emit_line(&format!("{} _recv = *this;", owner));
                    if rendered.returns_void() {
                        out.emit_line(&format!("{};", forward));
                    } else {
                        out.emit_line(&format!("return {};", forward));
                    }
                    out.dedent();
                    out.emit_line("}");
                    out.emit_line(&format!("{} {}({});", rendered.result, by_value_name(&name), params));
                }
                MethodShape::Plain | MethodShape::PlainByValue => {
                    out.emit_line(&format!("{} {}({});", rendered.result, name, params));
                }
            }
        }
        Ok(())
    }

    /// `is_zero` specialization: the conjunction of each part's own predicate
    fn zero_predicate(&self, named: &NamedType, parts: &[String]) -> String {
        let qualified = self.qualified(named);
        let body = if parts.is_empty() {
            "true".to_string()
        } else {
            parts
                .iter()
                .map(|p| format!("goxx::is_zero({})", p))
                .collect::<Vec<_>>()
                .join(" && ")
        };
        let mut out = self.emitter();
        out.emit_line("template <>");
        out.emit_line(&format!(
            "inline bool goxx::is_zero<{0}>(const {0} &v) {{",
            qualified
        ));
        out.indent();
        if parts.is_empty() {
            out.emit_line("(void)v;");
        }
        out.emit_line(&format!("return {};", body));
        out.dedent();
        out.emit_line("}");
        out.finish()
    }

    /// Wire a concrete type into `goxx::try_downcast`, once per program
    fn register_downcast(&mut self, id: TypeId, named: &NamedType) -> String {
        if self.cx.index.satisfied_interfaces(id).is_empty() {
            return String::new();
        }
        let qualified = self.qualified(named);
        let mut out = self.emitter();
        out.emit_line("template <>");
        out.emit_line(&format!(
            "inline {0} *goxx::try_downcast<{0}>(const goxx::interface &iface) {{",
            qualified
        ));
        out.indent();
        out.emit_line(&format!("return goxx::downcast_object<{}>(iface);", qualified));
        out.dedent();
        out.emit_line("}");
        let text = out.finish();
        if self.session.once("goxx", &text) {
            text
        } else {
            String::new()
        }
    }
}
