//! Type identity
//!
//! Named types are identical only to themselves; every other type is
//! compared structurally. Parameter names never take part in identity.

use goxx_ast::{NamedType, Param, ResolvedType, Signature, TypeId, TypeTable};

/// Whether `a` and `b` denote the same type
pub fn identical(types: &TypeTable, a: TypeId, b: TypeId) -> bool {
    if a == b {
        return true;
    }
    let (Some(ta), Some(tb)) = (types.get(a), types.get(b)) else {
        return false;
    };

    match (ta, tb) {
        (ResolvedType::Named(na), ResolvedType::Named(nb)) => same_declaration(na, nb),
        (ResolvedType::Basic { basic: ka }, ResolvedType::Basic { basic: kb }) => ka == kb,
        (ResolvedType::Pointer { elem: ea }, ResolvedType::Pointer { elem: eb })
        | (ResolvedType::Slice { elem: ea }, ResolvedType::Slice { elem: eb }) => {
            identical(types, *ea, *eb)
        }
        (
            ResolvedType::Array { elem: ea, len: la },
            ResolvedType::Array { elem: eb, len: lb },
        ) => la == lb && identical(types, *ea, *eb),
        (
            ResolvedType::Map { key: ka, elem: ea },
            ResolvedType::Map { key: kb, elem: eb },
        ) => identical(types, *ka, *kb) && identical(types, *ea, *eb),
        (
            ResolvedType::Chan { elem: ea, dir: da },
            ResolvedType::Chan { elem: eb, dir: db },
        ) => da == db && identical(types, *ea, *eb),
        (ResolvedType::Struct { fields: fa }, ResolvedType::Struct { fields: fb }) => {
            fa.len() == fb.len()
                && fa.iter().zip(fb).all(|(x, y)| {
                    x.name == y.name && x.embedded == y.embedded && identical(types, x.ty, y.ty)
                })
        }
        (ResolvedType::Interface { methods: ma }, ResolvedType::Interface { methods: mb }) => {
            if ma.len() != mb.len() {
                return false;
            }
            let mut sa: Vec<_> = ma.iter().collect();
            let mut sb: Vec<_> = mb.iter().collect();
            sa.sort_by(|x, y| x.name.cmp(&y.name));
            sb.sort_by(|x, y| x.name.cmp(&y.name));
            sa.iter()
                .zip(sb.iter())
                .all(|(x, y)| x.name == y.name && identical(types, x.sig, y.sig))
        }
        (ResolvedType::Signature(sa), ResolvedType::Signature(sb)) => {
            identical_signatures(types, sa, sb)
        }
        (ResolvedType::Tuple { items: ia }, ResolvedType::Tuple { items: ib }) => {
            ia.len() == ib.len() && ia.iter().zip(ib).all(|(x, y)| identical(types, *x, *y))
        }
        _ => false,
    }
}

/// Signature identity: same arity, same variadic flag, identical parameter and result types
pub fn identical_signatures(types: &TypeTable, a: &Signature, b: &Signature) -> bool {
    a.variadic == b.variadic
        && identical_params(types, &a.params, &b.params)
        && identical_params(types, &a.results, &b.results)
}

fn identical_params(types: &TypeTable, a: &[Param], b: &[Param]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| identical(types, x.ty, y.ty))
}

fn same_declaration(a: &NamedType, b: &NamedType) -> bool {
    a.package == b.package && a.name == b.name
}

#[cfg(test)]
mod tests {
    use super::*;
    use goxx_ast::builder::ProgramBuilder;
    use goxx_ast::{BasicKind, ChanDir};

    #[test]
    fn test_structural_identity() {
        let mut b = ProgramBuilder::new();
        let int = b.basic(BasicKind::Int);
        let s1 = b.slice(int);
        let s2 = b.slice(int);
        let m1 = b.map(int, s1);
        let m2 = b.map(int, s2);
        let types = b.types();

        assert!(identical(types, s1, s2));
        assert!(identical(types, m1, m2));
        assert!(!identical(types, s1, m1));
    }

    #[test]
    fn test_named_identity_is_nominal() {
        let mut b = ProgramBuilder::new();
        let int = b.basic(BasicKind::Int);
        let celsius = b.named("main", "Celsius", int);
        let fahrenheit = b.named("main", "Fahrenheit", int);
        let types = b.types();

        assert!(!identical(types, celsius, fahrenheit));
        assert!(!identical(types, celsius, int));
        assert!(identical(types, celsius, celsius));
    }

    #[test]
    fn test_signature_ignores_param_names() {
        let mut b = ProgramBuilder::new();
        let int = b.basic(BasicKind::Int);
        let string = b.basic(BasicKind::String);
        let named = b.func_named(&[("count", int)], &[string], false);
        let anon = b.func(&[int], &[string]);
        let variadic = b.func_named(&[("count", int)], &[string], true);
        let types = b.types();

        assert!(identical(types, named, anon));
        assert!(!identical(types, named, variadic));
    }

    #[test]
    fn test_channel_direction_matters() {
        let mut b = ProgramBuilder::new();
        let int = b.basic(BasicKind::Int);
        let both = b.chan(int, ChanDir::BOTH);
        let recv = b.chan(int, ChanDir::RECV);
        assert!(!identical(b.types(), both, recv));
    }
}
