//! Interface satisfaction index
//!
//! Go interfaces are satisfied structurally. The C++ output needs the
//! relation spelled out: a concrete type inherits from every contract it
//! satisfies, and a contract registers every concrete type it can be
//! downcast to. The index is computed once per program by testing every
//! named type against every non-empty named contract.
//!
//! Both the type list and the contract list are sorted by qualified name
//! before the scan, so the two views enumerate in a stable order and repeated
//! translations produce identical output.

use crate::error::{CheckError, Result};
use crate::method_set::implements;
use goxx_ast::{Program, ResolvedType, TypeId, TypeTable};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

/// Which side of the relation a query should keep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFilter {
    Any,
    /// Non-interface types only (a contract's downcast registry)
    ConcreteOnly,
    /// Interface types only
    InterfaceOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedType {
    pub id: TypeId,
    pub qualified_name: String,
    pub is_interface: bool,
}

/// Bidirectional concrete-type / contract relation
#[derive(Debug, Clone, Default)]
pub struct SatisfactionIndex {
    types: Vec<IndexedType>,
    positions: BTreeMap<TypeId, usize>,
    satisfied: BTreeMap<TypeId, Vec<TypeId>>,
    satisfying: BTreeMap<TypeId, Vec<TypeId>>,
}

impl SatisfactionIndex {
    /// Scan the whole program
    pub fn build(program: &Program) -> Result<Self> {
        Self::from_types(&program.types)
    }

    pub fn from_types(types: &TypeTable) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut universe = Vec::new();

        for (id, ty) in types.iter() {
            let ResolvedType::Named(named) = ty else {
                continue;
            };
            if named.is_error() {
                continue;
            }
            let qualified_name = named.qualified_name();
            // The front end may describe the same declaration more than once.
            if !seen.insert(qualified_name.clone()) {
                continue;
            }
            let underlying = types
                .underlying(id)
                .ok_or(CheckError::UnknownType(named.underlying))?;
            universe.push(IndexedType {
                id,
                qualified_name,
                is_interface: matches!(underlying, ResolvedType::Interface { .. }),
            });
        }

        universe.sort_by(|a, b| {
            a.qualified_name
                .cmp(&b.qualified_name)
                .then(a.id.cmp(&b.id))
        });

        let contracts: Vec<TypeId> = universe
            .iter()
            .filter(|t| t.is_interface && !types.is_empty_interface(t.id))
            .map(|t| t.id)
            .collect();

        let mut index = SatisfactionIndex {
            positions: universe
                .iter()
                .enumerate()
                .map(|(i, t)| (t.id, i))
                .collect(),
            types: universe,
            ..Default::default()
        };

        for candidate in index.types.iter().map(|t| t.id) {
            for &contract in &contracts {
                if candidate == contract || !implements(types, candidate, contract) {
                    continue;
                }
                trace!(?candidate, ?contract, "satisfies");
                index.satisfied.entry(candidate).or_default().push(contract);
                index.satisfying.entry(contract).or_default().push(candidate);
            }
        }

        debug!(
            types = index.types.len(),
            contracts = contracts.len(),
            pairs = index.pair_count(),
            "built satisfaction index"
        );
        Ok(index)
    }

    /// Contracts satisfied by `ty`, in qualified-name order
    pub fn satisfied_interfaces(&self, ty: TypeId) -> &[TypeId] {
        self.satisfied.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Types satisfying `contract`, in qualified-name order
    pub fn satisfying_types(&self, contract: TypeId, filter: TypeFilter) -> Vec<TypeId> {
        self.satisfying
            .get(&contract)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| match filter {
                TypeFilter::Any => true,
                TypeFilter::ConcreteOnly => !self.is_interface(*id),
                TypeFilter::InterfaceOnly => self.is_interface(*id),
            })
            .collect()
    }

    pub fn satisfies(&self, ty: TypeId, contract: TypeId) -> bool {
        self.satisfied_interfaces(ty).contains(&contract)
    }

    /// All indexed named types, sorted
    pub fn types(&self) -> &[IndexedType] {
        &self.types
    }

    pub fn entry(&self, id: TypeId) -> Option<&IndexedType> {
        self.positions.get(&id).map(|&i| &self.types[i])
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        self.entry(id).is_some_and(|t| t.is_interface)
    }

    /// Every (type, contract) pair in a stable order
    pub fn pairs(&self) -> impl Iterator<Item = (TypeId, TypeId)> + '_ {
        self.types.iter().flat_map(move |t| {
            self.satisfied_interfaces(t.id)
                .iter()
                .map(move |&contract| (t.id, contract))
        })
    }

    pub fn pair_count(&self) -> usize {
        self.satisfied.values().map(Vec::len).sum()
    }
}
