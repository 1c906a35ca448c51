//! Declaration order for named types
//!
//! C++ needs a complete type before it can be used by value or as a base.
//! Named types are reordered so that every by-value field type and every
//! satisfied contract declared in the same batch comes first. Ties keep
//! encounter order.

use crate::satisfaction::SatisfactionIndex;
use goxx_ast::{ResolvedType, TypeId, TypeTable};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use std::collections::HashMap;
use tracing::warn;

/// Named types `id` needs complete before its own declaration
pub fn value_dependencies(types: &TypeTable, index: &SatisfactionIndex, id: TypeId) -> Vec<TypeId> {
    let mut deps = index.satisfied_interfaces(id).to_vec();
    if let Some(named) = types.named(id) {
        collect_value_deps(types, named.underlying, &mut deps);
    }
    deps
}

fn collect_value_deps(types: &TypeTable, id: TypeId, deps: &mut Vec<TypeId>) {
    match types.get(id) {
        Some(ResolvedType::Named(_)) => {
            if !deps.contains(&id) {
                deps.push(id);
            }
        }
        Some(ResolvedType::Struct { fields }) => {
            for field in fields {
                collect_value_deps(types, field.ty, deps);
            }
        }
        Some(ResolvedType::Array { elem, .. }) => collect_value_deps(types, *elem, deps),
        _ => {}
    }
}

/// Order `decls` so that dependencies precede dependents
pub fn order_type_decls(types: &TypeTable, index: &SatisfactionIndex, decls: &[TypeId]) -> Vec<TypeId> {
    let mut graph: DiGraph<TypeId, ()> = DiGraph::new();
    let nodes: HashMap<TypeId, NodeIndex> = decls
        .iter()
        .map(|&id| (id, graph.add_node(id)))
        .collect();

    for &id in decls {
        // Neighbors are walked most-recent-first and pushed on a stack, so
        // insertion order is the order dependencies get emitted.
        for dep in value_dependencies(types, index, id) {
            if let (Some(&from), Some(&to)) = (nodes.get(&id), nodes.get(&dep)) {
                if from != to {
                    graph.add_edge(from, to, ());
                }
            }
        }
    }

    if is_cyclic_directed(&graph) {
        warn!("named types contain each other by value; keeping declaration order");
        return decls.to_vec();
    }

    let mut ordered = Vec::with_capacity(decls.len());
    let mut dfs = DfsPostOrder::empty(&graph);
    for &id in decls {
        let start = nodes[&id];
        if dfs.discovered.contains(start.index()) {
            continue;
        }
        dfs.move_to(start);
        while let Some(node) = dfs.next(&graph) {
            ordered.push(graph[node]);
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use goxx_ast::builder::ProgramBuilder;
    use goxx_ast::{BasicKind, Receiver};

    #[test]
    fn test_field_types_come_first() {
        let mut b = ProgramBuilder::new();
        let int = b.basic(BasicKind::Int);
        let point = b.declare_named("main", "Point");
        let line = b.declare_named("main", "Line");
        let ptr = b.pointer(line);
        let line_body = b.struct_type(&[("a", point), ("b", point), ("next", ptr)]);
        let point_body = b.struct_type(&[("x", int), ("y", int)]);
        b.set_underlying(line, line_body);
        b.set_underlying(point, point_body);
        let types = b.build().types;
        let index = SatisfactionIndex::from_types(&types).unwrap();

        assert_eq!(order_type_decls(&types, &index, &[line, point]), vec![point, line]);
        assert_eq!(order_type_decls(&types, &index, &[point, line]), vec![point, line]);
    }

    #[test]
    fn test_contracts_precede_implementers() {
        let mut b = ProgramBuilder::new();
        let string = b.basic(BasicKind::String);
        let sig = b.func(&[], &[string]);
        let body = b.struct_type(&[]);
        let t = b.named("main", "T", body);
        b.method(t, "String", sig, Receiver::ByRef);
        let contract = b.interface(&[("String", sig)]);
        let stringer = b.named("main", "Stringer", contract);
        let types = b.build().types;
        let index = SatisfactionIndex::from_types(&types).unwrap();

        assert_eq!(order_type_decls(&types, &index, &[t, stringer]), vec![stringer, t]);
    }

    #[test]
    fn test_unrelated_types_keep_encounter_order() {
        let mut b = ProgramBuilder::new();
        let int = b.basic(BasicKind::Int);
        let a = b.named("main", "A", int);
        let z = b.named("main", "Z", int);
        let m = b.named("main", "M", int);
        let types = b.build().types;
        let index = SatisfactionIndex::from_types(&types).unwrap();

        assert_eq!(order_type_decls(&types, &index, &[z, a, m]), vec![z, a, m]);
    }
}
