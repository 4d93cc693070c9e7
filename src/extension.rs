//! Session extensions
//!
//! An extension is a type constructed from a session that can contribute
//! native library imports. Extensions are attached once per type and can be
//! looked up by type or by name.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::ffi::LibraryImports;
use crate::session::Session;

/// Name used when an extension does not provide one
pub const DEFAULT_EXTENSION_NAME: &str = "extension";

/// A session extension
pub trait Extension: Any + Send + Sync {
    /// Build the extension for `session`
    fn create(session: &Session) -> Self
    where
        Self: Sized;

    /// Lookup name; normalized to lower case when attached
    fn name(&self) -> &str {
        DEFAULT_EXTENSION_NAME
    }

    /// Libraries to import when the extension is attached
    fn dll_imports(&self) -> LibraryImports {
        LibraryImports::new()
    }
}

/// Normalized lookup name
pub fn normalize_name(name: &str) -> String {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        DEFAULT_EXTENSION_NAME.to_string()
    } else {
        name
    }
}

struct Attached {
    name: String,
    instance: Arc<dyn Any + Send + Sync>,
    extension: Arc<dyn Extension>,
}

/// Extensions attached to a session, keyed by type
#[derive(Default)]
pub struct ExtensionSet {
    by_type: HashMap<TypeId, Attached>,
    order: Vec<TypeId>,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains<E: Extension>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<E>())
    }

    /// Attach an extension; an already attached type keeps its instance
    pub fn insert<E: Extension>(&mut self, extension: E) -> Arc<E> {
        if let Some(existing) = self.get::<E>() {
            return existing;
        }

        let name = normalize_name(extension.name());
        let extension = Arc::new(extension);
        let type_id = TypeId::of::<E>();
        self.by_type.insert(
            type_id,
            Attached {
                name,
                instance: extension.clone(),
                extension: extension.clone(),
            },
        );
        self.order.push(type_id);
        extension
    }

    pub fn get<E: Extension>(&self) -> Option<Arc<E>> {
        let attached = self.by_type.get(&TypeId::of::<E>())?;
        Arc::clone(&attached.instance).downcast::<E>().ok()
    }

    /// First attached extension with this name
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn Extension>> {
        let name = normalize_name(name);
        self.order
            .iter()
            .filter_map(|id| self.by_type.get(id))
            .find(|attached| attached.name == name)
            .map(|attached| Arc::clone(&attached.extension))
    }

    /// Normalized names in attach order
    pub fn names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|id| self.by_type.get(id))
            .map(|attached| attached.name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl std::fmt::Debug for ExtensionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
