pub mod model;
pub mod release;

pub use model::{FabricLock, Instance, Lockfile, Package, PackageType, Platform};
pub use release::{instance_for_query, PackageQuery, Release, ReleaseError, ReleaseResolver};
