//! Translation session
//!
//! State shared by every file of one translation: the emitted-declaration
//! filter, the synthesized identifier counter, the hoisted map value aliases
//! and the package initialisation bookkeeping the entry point needs. One
//! session is threaded by reference through every component.

use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct Session {
    emitted: HashSet<(String, String)>,
    counter: u64,
    aliases: Vec<(String, String)>,
    alias_lookup: HashMap<String, String>,
    init_calls: Vec<String>,
    package_inits: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `text` for `scope`; false when it was already emitted there
    pub fn once(&mut self, scope: &str, text: &str) -> bool {
        self.emitted.insert((scope.to_string(), text.to_string()))
    }

    pub fn fresh_ident(&mut self) -> String {
        self.counter += 1;
        format!("_ident_{}_", self.counter)
    }

    pub fn fresh_label(&mut self) -> String {
        self.counter += 1;
        format!("_label_{}_", self.counter)
    }

    /// Alias name for a hoisted type signature, keyed by its text
    pub fn alias_for(&mut self, signature: &str) -> String {
        if let Some(alias) = self.alias_lookup.get(signature) {
            return alias.clone();
        }
        let alias = self.fresh_ident();
        self.alias_lookup.insert(signature.to_string(), alias.clone());
        self.aliases.push((alias.clone(), signature.to_string()));
        alias
    }

    /// Hoisted aliases in creation order
    pub fn aliases(&self) -> &[(String, String)] {
        &self.aliases
    }

    /// Register a qualified package `init` function
    pub fn add_init_call(&mut self, qualified: String) {
        self.init_calls.push(qualified);
    }

    pub fn init_calls(&self) -> &[String] {
        &self.init_calls
    }

    /// Register a package carrying a variable initializer function
    pub fn add_package_init(&mut self, namespace: String) {
        if !self.package_inits.contains(&namespace) {
            self.package_inits.push(namespace);
        }
    }

    pub fn package_inits(&self) -> &[String] {
        &self.package_inits
    }
}
