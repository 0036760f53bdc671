//! The capability registry: the static catalog of tools and resources a
//! server instance advertises, each bound to its handler.
//!
//! The registry is populated once, before the message loop starts, and is
//! read-only thereafter — there are no runtime registration races to guard
//! against. Iteration order is registration order, which `tools/list` and
//! `resources/list` serve directly, so discovery replies are deterministic.
//!
//! Dispatch is a map lookup (name to descriptor + bound handler), not a
//! string-match chain: adding a tool means one `register_tool` call, and the
//! handler signature is checked at compile time.

pub mod descriptor;
pub mod validate;

pub use descriptor::{ArgumentSchema, FieldKind, FieldSpec, ResourceDescriptor, ToolDescriptor};
pub use validate::{validate, UnknownFieldPolicy, ValidatedArguments, ValidationError};

use indexmap::IndexMap;
use thiserror::Error;

use crate::handler::{ResourceReader, ToolHandler};

/// Errors raised while populating a registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A tool with this name is already registered.
    #[error("duplicate tool name: {name}")]
    DuplicateTool {
        /// The conflicting name.
        name: String,
    },

    /// A resource with this URI is already registered.
    #[error("duplicate resource URI: {uri}")]
    DuplicateResource {
        /// The conflicting URI.
        uri: String,
    },
}

/// A tool descriptor bound to its handler.
pub struct RegisteredTool {
    /// The declarative half: name, description, argument schema.
    pub descriptor: ToolDescriptor,
    /// The bound handler function.
    pub handler: ToolHandler,
}

/// A resource descriptor bound to its reader.
pub struct RegisteredResource {
    /// The declarative half: URI, name, MIME type.
    pub descriptor: ResourceDescriptor,
    /// The bound reader function.
    pub reader: ResourceReader,
}

/// The catalog of tools and resources one server instance serves.
#[derive(Default)]
pub struct Registry {
    tools: IndexMap<String, RegisteredTool>,
    resources: IndexMap<String, RegisteredResource>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its descriptor's name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateTool`] if the name is taken.
    pub fn register_tool(
        &mut self,
        descriptor: ToolDescriptor,
        handler: ToolHandler,
    ) -> Result<(), RegistryError> {
        if self.tools.contains_key(&descriptor.name) {
            return Err(RegistryError::DuplicateTool {
                name: descriptor.name,
            });
        }
        self.tools.insert(
            descriptor.name.clone(),
            RegisteredTool {
                descriptor,
                handler,
            },
        );
        Ok(())
    }

    /// Registers a resource under its descriptor's URI.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateResource`] if the URI is taken.
    pub fn register_resource(
        &mut self,
        descriptor: ResourceDescriptor,
        reader: ResourceReader,
    ) -> Result<(), RegistryError> {
        if self.resources.contains_key(&descriptor.uri) {
            return Err(RegistryError::DuplicateResource {
                uri: descriptor.uri,
            });
        }
        self.resources.insert(
            descriptor.uri.clone(),
            RegisteredResource { descriptor, reader },
        );
        Ok(())
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn lookup_tool(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// Looks up a resource by URI.
    #[must_use]
    pub fn lookup_resource(&self, uri: &str) -> Option<&RegisteredResource> {
        self.resources.get(uri)
    }

    /// Tool descriptors in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values().map(|tool| &tool.descriptor)
    }

    /// Resource descriptors in registration order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values().map(|resource| &resource.descriptor)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Number of registered resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if at least one resource is registered.
    #[must_use]
    pub fn has_resources(&self) -> bool {
        !self.resources.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .finish()
    }
}
