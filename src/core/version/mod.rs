pub mod catalog;
pub mod launch_manifest;
pub mod library;

pub use catalog::{CatalogEntry, VersionCatalog};
pub use launch_manifest::{
    Arguments, AssetIndexInfo, DownloadArtifact, JavaVersionInfo, LaunchManifest,
    VersionDownloads,
};
pub use library::{HostPlatform, Library, LibraryFile};
