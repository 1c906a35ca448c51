//! Lexical scopes and their bindings

use crate::types::TypeId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "binding", rename_all = "snake_case")]
pub enum BindingKind {
    Var,
    Param,
    /// Named result parameter
    Result,
    Receiver,
    /// Constant with its folded literal value
    Const { value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub id: BindingId,
    pub name: String,
    pub ty: TypeId,
    pub kind: BindingKind,
}

impl Binding {
    /// Whether the enclosing block has to declare this binding itself
    pub fn is_block_local(&self) -> bool {
        !matches!(
            self.kind,
            BindingKind::Param | BindingKind::Receiver
        ) && self.name != "_"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default)]
    pub parent: Option<ScopeId>,
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// All scopes of one package
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            bindings: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    /// Resolve `name` from `scope` outwards
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id)?;
            if let Some(binding) = scope.bindings.iter().find(|b| b.name == name) {
                return Some(binding);
            }
            current = scope.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(id: u32, name: &str, kind: BindingKind) -> Binding {
        Binding {
            id: BindingId(id),
            name: name.to_string(),
            ty: TypeId(0),
            kind,
        }
    }

    #[test]
    fn test_lookup_shadowing() {
        let mut tree = ScopeTree::new();
        let outer = tree.push(None);
        let inner = tree.push(Some(outer));
        tree.get_mut(outer).unwrap().bindings.push(binding(0, "x", BindingKind::Var));
        tree.get_mut(inner).unwrap().bindings.push(binding(1, "x", BindingKind::Var));
        tree.get_mut(outer).unwrap().bindings.push(binding(2, "y", BindingKind::Var));

        assert_eq!(tree.lookup(inner, "x").map(|b| b.id), Some(BindingId(1)));
        assert_eq!(tree.lookup(inner, "y").map(|b| b.id), Some(BindingId(2)));
        assert_eq!(tree.lookup(outer, "x").map(|b| b.id), Some(BindingId(0)));
        assert!(tree.lookup(inner, "z").is_none());
    }

    #[test]
    fn test_params_are_not_block_local() {
        assert!(!binding(0, "p", BindingKind::Param).is_block_local());
        assert!(!binding(1, "_", BindingKind::Var).is_block_local());
        assert!(binding(2, "r", BindingKind::Result).is_block_local());
    }
}
