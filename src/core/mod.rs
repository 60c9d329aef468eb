// ─── packlaunch core ───
// Launch pipeline for Minecraft instances.
//
// Architecture:
//   core/
//     instance/   — Instance model + release resolution seam
//     version/    — Version catalog, launch manifests, library rules
//     maven/      — Artifact coordinate parser
//     downloader/ — Concurrent downloads with SHA-1 validation
//     assets/     — Asset index + object downloads
//     loaders/    — Vanilla / Fabric manifest sources + cached resolver
//     launch/     — Libraries, natives, classpath, command builder, session
//     supervisor/ — Process lifecycle, crash-test watchdog, shutdown
//     java/       — Java binary selection, managed runtimes
//     state/      — Settings + data directories

pub mod assets;
pub mod auth;
pub mod downloader;
pub mod error;
pub mod http;
pub mod instance;
pub mod java;
pub mod launch;
pub mod loaders;
pub mod maven;
pub mod state;
pub mod supervisor;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;
