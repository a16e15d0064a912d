/*
 * This module consolidates the platform-agnostic logic behind project pages.
 * It re-exports the key data structures and the service abstractions
 * (`PathResolverOperations`, `ProjectFileManagerOperations`,
 * `ContentRendererOperations`, `HealthStoreOperations` and
 * `ConfigManagerOperations`) so the web layer and the CLI can wire concrete
 * implementations together without reaching into submodules.
 */
pub mod checksum_utils;
pub mod config;
pub mod file_manager;
pub mod health_store;
pub mod models;
pub mod path_resolver;
pub mod path_utils;
pub mod renderer;
pub mod response;
pub mod virtual_pages;

#[cfg(test)]
pub mod test_support;

// Re-export key structures and enums
pub use models::{
    AccessContext, ContentKind, EntryRef, FileEntry, Project, Record, RenderedContent, UserId,
};

// Re-export path resolution related items
pub use path_resolver::{BoundaryError, BoundaryReason, CorePathResolver, PathResolverOperations};

// Re-export file manager related items
pub use file_manager::{ContentError, CoreProjectFileManager, ProjectFileManagerOperations};

pub use renderer::{Column, ContentRendererOperations, CoreContentRenderer};

pub use virtual_pages::{RegistryError, VirtualPageDescriptor, VirtualPageRegistry};

pub use health_store::{
    DataStoreError, HealthStoreOperations, InMemoryHealthStore, JsonHealthStore,
};

// Re-export config related items
pub use config::{
    ConfigError, ConfigManagerOperations, CoreConfigManager, SiteCatalog, SiteConfig,
};

pub use response::PageResponse;
