//! Method sets

use goxx_ast::{ResolvedType, TypeId, TypeTable};

/// One method in a method set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodEntry<'a> {
    pub name: &'a str,
    pub sig: TypeId,
}

/// Methods callable on a value of type `id`
///
/// Declared methods count regardless of receiver kind, and a pointer shares
/// the method set of its named element.
pub fn method_set(types: &TypeTable, id: TypeId) -> Vec<MethodEntry<'_>> {
    match types.get(id) {
        Some(ResolvedType::Named(named)) => {
            if let Some(ResolvedType::Interface { methods }) = types.get(named.underlying) {
                return methods
                    .iter()
                    .map(|m| MethodEntry {
                        name: &m.name,
                        sig: m.sig,
                    })
                    .collect();
            }
            named
                .methods
                .iter()
                .map(|m| MethodEntry {
                    name: &m.name,
                    sig: m.sig,
                })
                .collect()
        }
        Some(ResolvedType::Pointer { elem }) => match types.get(*elem) {
            Some(ResolvedType::Named(_)) => method_set(types, *elem),
            _ => Vec::new(),
        },
        Some(ResolvedType::Interface { methods }) => methods
            .iter()
            .map(|m| MethodEntry {
                name: &m.name,
                sig: m.sig,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Methods a value must provide to satisfy `contract`
pub fn contract_methods(types: &TypeTable, contract: TypeId) -> Vec<MethodEntry<'_>> {
    match types.underlying(contract) {
        Some(ResolvedType::Interface { methods }) => methods
            .iter()
            .map(|m| MethodEntry {
                name: &m.name,
                sig: m.sig,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Structural satisfaction: every contract method has a same-named,
/// identically typed counterpart in the method set of `ty`
pub fn implements(types: &TypeTable, ty: TypeId, contract: TypeId) -> bool {
    let required = contract_methods(types, contract);
    if required.is_empty() {
        return true;
    }
    let provided = method_set(types, ty);
    required.iter().all(|req| {
        provided
            .iter()
            .any(|m| m.name == req.name && crate::identity::identical(types, m.sig, req.sig))
    })
}
