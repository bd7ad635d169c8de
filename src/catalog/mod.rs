// src/catalog/mod.rs

//! Port catalog adapters.
//!
//! A [`PortCatalog`] resolves a port name to its descriptor. The planner
//! only ever asks by name; absence is an answer, not an error, because a
//! package can be installed while its port has been dropped from the
//! catalog.

mod parser;

pub use parser::{parse_port_file, PORT_FILE_NAME};

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::error::Error;
use crate::port::PortDescriptor;

/// Lazy name-to-descriptor resolver.
pub trait PortCatalog {
    /// Look up the descriptor for a port. Identical names share the same
    /// descriptor regardless of triplet.
    fn get_control_file(&self, name: &str) -> Option<Arc<PortDescriptor>>;
}

/// In-memory catalog backed by a pre-populated map.
#[derive(Debug, Default)]
pub struct MapPortCatalog {
    ports: HashMap<String, Arc<PortDescriptor>>,
}

impl MapPortCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, port: PortDescriptor) {
        self.ports.insert(port.name.clone(), Arc::new(port));
    }
}

impl FromIterator<PortDescriptor> for MapPortCatalog {
    fn from_iter<I: IntoIterator<Item = PortDescriptor>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for port in iter {
            catalog.insert(port);
        }
        catalog
    }
}

impl PortCatalog for MapPortCatalog {
    fn get_control_file(&self, name: &str) -> Option<Arc<PortDescriptor>> {
        self.ports.get(name).cloned()
    }
}

/// Catalog that resolves names to `<root>/<name>/port.toml` on demand.
///
/// Resolutions are cached for the lifetime of the catalog; the cache is
/// never invalidated within one planner run. A port that fails to parse
/// resolves to `None`, with the diagnostic retained for the caller's log.
pub struct DiskPortCatalog {
    root: PathBuf,
    cache: RefCell<HashMap<String, Option<Arc<PortDescriptor>>>>,
    diagnostics: RefCell<Vec<String>>,
}

impl DiskPortCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RefCell::new(HashMap::new()),
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Diagnostics accumulated for ports that failed to parse, draining the
    /// internal buffer.
    pub fn take_diagnostics(&self) -> Vec<String> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    fn load(&self, name: &str) -> Option<Arc<PortDescriptor>> {
        let path = self.root.join(name).join(PORT_FILE_NAME);
        let result = match std::fs::read_to_string(&path) {
            Ok(text) => parse_port_file(name, &text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => Err(Error::from(e)),
        };

        match result {
            Ok(port) => Some(Arc::new(port)),
            Err(e) => {
                let diagnostic = format!("{}: {}", path.display(), e);
                warn!("{}", diagnostic);
                self.diagnostics.borrow_mut().push(diagnostic);
                None
            }
        }
    }
}

impl PortCatalog for DiskPortCatalog {
    fn get_control_file(&self, name: &str) -> Option<Arc<PortDescriptor>> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return cached.clone();
        }

        let loaded = self.load(name);
        self.cache
            .borrow_mut()
            .insert(name.to_string(), loaded.clone());
        loaded
    }
}
