//! Directive and role registry
//!
//! Handlers are looked up by name, optionally qualified with a domain
//! (`domain:name`). Unqualified lookups walk the default domain
//! resolution order. The registry is immutable once built and can be
//! shared across parses.

pub mod builtin;
pub mod options;
pub mod roles;
pub mod runtime;

pub use options::OptionValidator;
pub use roles::RoleFn;
pub use runtime::{DirectiveAbort, DirectiveError, DirectiveFn, DirectiveInvocation};

use std::collections::HashMap;

/// Everything the runtime needs to parse and dispatch one directive.
pub struct DirectiveSpec {
    pub required_args: usize,
    pub optional_args: usize,
    pub final_arg_whitespace: bool,
    pub has_content: bool,
    pub option_spec: Vec<(String, OptionValidator)>,
    pub run: DirectiveFn,
}

impl DirectiveSpec {
    pub fn validator_for(&self, name: &str) -> Option<OptionValidator> {
        self.option_spec
            .iter()
            .find(|(option, _)| option == name)
            .map(|&(_, validator)| validator)
    }
}

#[derive(Default)]
struct Domain {
    directives: HashMap<String, DirectiveSpec>,
    roles: HashMap<String, RoleFn>,
}

pub struct DirectiveRegistry {
    domains: HashMap<String, Domain>,
    resolution_order: Vec<String>,
}

impl DirectiveRegistry {
    pub fn builder() -> DirectiveRegistryBuilder {
        DirectiveRegistryBuilder::new()
    }

    fn split_qualified<'n>(name: &'n str) -> Option<(&'n str, &'n str)> {
        name.split_once(':')
    }

    pub fn lookup_directive(&self, name: &str) -> Option<&DirectiveSpec> {
        if let Some((domain, rest)) = Self::split_qualified(name) {
            return self
                .domains
                .get(domain)
                .and_then(|d| d.directives.get(rest));
        }
        for domain in &self.resolution_order {
            if let Some(spec) = self
                .domains
                .get(domain)
                .and_then(|d| d.directives.get(name))
            {
                return Some(spec);
            }
        }
        None
    }

    pub fn lookup_role(&self, name: &str) -> Option<RoleFn> {
        if let Some((domain, rest)) = Self::split_qualified(name) {
            return self
                .domains
                .get(domain)
                .and_then(|d| d.roles.get(rest))
                .copied();
        }
        for domain in &self.resolution_order {
            if let Some(&role) = self.domains.get(domain).and_then(|d| d.roles.get(name)) {
                return Some(role);
            }
        }
        None
    }

    /// Whether `domain` has any registrations. Roles qualified with a
    /// domain nobody registered are genuinely unknown; unqualified
    /// names without a specific handler fall through to a generic
    /// `Role` node instead.
    pub fn has_domain(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }
}

/// Accumulates registrations; `build` freezes them.
pub struct DirectiveRegistryBuilder {
    domains: HashMap<String, Domain>,
    default_domain: Option<String>,
}

impl DirectiveRegistryBuilder {
    fn new() -> Self {
        Self {
            domains: HashMap::new(),
            default_domain: None,
        }
    }

    /// Domain tried first for unqualified lookups (a project override).
    pub fn default_domain(mut self, domain: &str) -> Self {
        self.default_domain = Some(domain.to_string());
        self
    }

    pub fn directive(mut self, domain: &str, name: &str, spec: DirectiveSpec) -> Self {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .directives
            .insert(name.to_string(), spec);
        self
    }

    pub fn role(mut self, domain: &str, name: &str, role: RoleFn) -> Self {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .roles
            .insert(name.to_string(), role);
        self
    }

    pub fn build(self) -> DirectiveRegistry {
        let mut resolution_order = Vec::new();
        if let Some(domain) = &self.default_domain {
            resolution_order.push(domain.clone());
        }
        for fallback in ["std", ""] {
            if !resolution_order.iter().any(|d| d == fallback) {
                resolution_order.push(fallback.to_string());
            }
        }
        DirectiveRegistry {
            domains: self.domains,
            resolution_order,
        }
    }
}
