//! Macro templates and the macro registry.
//!
//! The recording pass captures every element under `<Simulation>` as an
//! unexpanded [`Macro`] template. Templates are instantiated (possibly many
//! times) by the replay pass in [`crate::builder`]. Macros of different
//! element kinds may share a name; the registry key is the composite
//! `(name, kind tag)` pair.

use gantry_types::ElementId;
use hashbrown::HashMap;

use crate::values::Attr;

/// Composite registry key: element name plus element type name.
pub type MacroKey = (String, String);

/// An unexpanded element template.
#[derive(Debug, Clone, Default)]
pub struct MacroElement {
    /// Element type name (the XML tag).
    pub tag: String,
    /// Raw attributes in document order (placeholders not yet substituted).
    pub attrs: Vec<Attr>,
    /// Raw textual payload for textual element kinds.
    pub text: String,
    /// `<Set>` bindings declared directly inside this element,
    /// first-definition-wins.
    pub vars: Vec<(String, String)>,
    /// Child templates in document order.
    pub children: Vec<MacroElement>,
    /// Source file.
    pub file: String,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub column: u32,
}

impl MacroElement {
    /// The value of an attribute, if present.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }

    /// Whether this is a reference-only element: exactly one attribute
    /// (the `ref`) and no body.
    #[must_use]
    pub fn is_pure_reference(&self) -> bool {
        self.attrs.len() == 1
            && self.attrs[0].key == "ref"
            && self.children.is_empty()
            && self.text.trim().is_empty()
    }

    /// Record a `<Set>` binding; an existing binding of the same name wins.
    pub fn define_var(&mut self, name: String, value: String) {
        if !self.vars.iter().any(|(n, _)| *n == name) {
            self.vars.push((name, value));
        }
    }
}

/// A named, file-scoped template plus its optional cached instance.
///
/// The cached instance exists only for constant-flagged element kinds whose
/// replay used no placeholders; later bare references reuse it instead of
/// instantiating a copy.
#[derive(Debug, Clone)]
pub struct Macro {
    /// The template root.
    pub element: MacroElement,
    /// Cached shared instance, if one was built.
    pub instance: Option<ElementId>,
}

/// All macros recorded from one scene description (including its includes),
/// plus the `<Simulation>`-level variable bindings.
#[derive(Debug, Default)]
pub struct MacroRegistry {
    macros: HashMap<MacroKey, Macro>,
    /// Registration order, so replay diagnostics are deterministic.
    order: Vec<MacroKey>,
    /// File-level `<Set>` bindings, the outermost variable scope.
    pub globals: Vec<(String, String)>,
}

impl MacroRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a macro. Returns `false` if the composite key is taken.
    pub fn insert(&mut self, name: String, element: MacroElement) -> bool {
        let key = (name, element.tag.clone());
        if self.macros.contains_key(&key) {
            return false;
        }
        self.order.push(key.clone());
        self.macros.insert(
            key,
            Macro {
                element,
                instance: None,
            },
        );
        true
    }

    /// Look up a macro.
    #[must_use]
    pub fn get(&self, key: &MacroKey) -> Option<&Macro> {
        self.macros.get(key)
    }

    /// Look up a macro mutably (used to store cached instances).
    pub fn get_mut(&mut self, key: &MacroKey) -> Option<&mut Macro> {
        self.macros.get_mut(key)
    }

    /// Keys of all macros with the given element tag, in registration order.
    #[must_use]
    pub fn keys_with_tag(&self, tag: &str) -> Vec<MacroKey> {
        self.order
            .iter()
            .filter(|(_, t)| t == tag)
            .cloned()
            .collect()
    }

    /// Number of registered macros.
    #[must_use]
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Record a file-level `<Set>` binding, first-definition-wins.
    pub fn define_global(&mut self, name: String, value: String) {
        if !self.globals.iter().any(|(n, _)| *n == name) {
            self.globals.push((name, value));
        }
    }
}
