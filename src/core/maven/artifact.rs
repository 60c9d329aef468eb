use std::fmt;
use std::path::PathBuf;

use crate::core::error::{LauncherError, LauncherResult};

/// Represents a fully parsed Maven coordinate.
///
/// Supported formats:
///   `groupId:artifactId:version`
///   `groupId:artifactId:version:classifier`
///   `groupId:artifactId:version:classifier@packaging`
///   `groupId:artifactId:version@packaging`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    /// File extension / packaging type. Defaults to `"jar"`.
    pub packaging: String,
}

impl MavenArtifact {
    /// Parse a Maven coordinate string.
    pub fn parse(coord: &str) -> LauncherResult<Self> {
        // Split off @packaging first
        let (coord_part, packaging_override) = if let Some(idx) = coord.rfind('@') {
            (&coord[..idx], Some(&coord[idx + 1..]))
        } else {
            (coord, None)
        };

        let parts: Vec<&str> = coord_part.split(':').collect();

        match parts.len() {
            3 => Ok(Self {
                group_id: parts[0].to_string(),
                artifact_id: parts[1].to_string(),
                version: parts[2].to_string(),
                classifier: None,
                packaging: packaging_override.unwrap_or("jar").to_string(),
            }),
            4 => Ok(Self {
                group_id: parts[0].to_string(),
                artifact_id: parts[1].to_string(),
                version: parts[2].to_string(),
                classifier: Some(parts[3].to_string()),
                packaging: packaging_override.unwrap_or("jar").to_string(),
            }),
            _ => Err(LauncherError::InvalidMavenCoordinate(coord.to_string())),
        }
    }

    /// Construct the group path portion (`net/sf/jopt-simple`).
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// Build the artifact filename.
    ///
    /// `artifactId-version[-classifier].packaging`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, c, self.packaging
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.packaging),
        }
    }

    /// Construct the full URL for this artifact under the given repository base.
    ///
    /// Template:
    /// `<repo>/<group_path>/<artifact_id>/<version>/<filename>`
    pub fn url(&self, repo_base: &str) -> String {
        let base = repo_base.trim_end_matches('/');
        format!(
            "{}/{}/{}/{}/{}",
            base,
            self.group_path(),
            self.artifact_id,
            self.version,
            self.filename()
        )
    }

    /// Local path relative to the libraries directory.
    ///
    /// Mirrors Maven's local repo layout:
    /// `<group_path>/<artifact_id>/<version>/<filename>`
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(self.group_path())
            .join(&self.artifact_id)
            .join(&self.version)
            .join(self.filename())
    }

    /// Native classifier variant of this artifact (`lwjgl-3.2.2-natives-linux.jar`).
    pub fn with_classifier(&self, classifier: &str) -> Self {
        let mut clone = self.clone();
        clone.classifier = Some(classifier.to_string());
        clone
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)?;
        if let Some(c) = &self.classifier {
            write!(f, ":{}", c)?;
        }
        if self.packaging != "jar" {
            write!(f, "@{}", self.packaging)?;
        }
        Ok(())
    }
}
