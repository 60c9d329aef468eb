mod artifact;

pub use artifact::MavenArtifact;

/// Default repository for libraries that do not name their own.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
