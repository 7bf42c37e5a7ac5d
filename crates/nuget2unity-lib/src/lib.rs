//! Repackages a NuGet package and its dependency closure as a `.unitypackage`.
//!
//! The pipeline runs in the following order, each step living in its own module.
//! 1. [`registry`] finds the root version and dependency manifests.
//! 1. [`dependency_walker`] expands the transitive closure.
//! 1. [`resolver`] picks a single version per package id.
//! 1. [`exclusion`] drops packages the Unity runtime already ships.
//! 1. [`installation`] downloads, extracts and selects binaries.
//! 1. [`unity`] copies the binaries into a project and writes the archive.
//!
//! [`repackage::repackage()`] strings all of these together.

pub mod error;
pub use error::Result;
pub use error::Error;

pub mod config;
pub use config::Config;

pub mod package;
pub use package::PackageIdentity;
pub use package::DependencyInfo;

pub mod registry;
pub use registry::Registry;

pub mod dependency_walker;
pub mod resolver;
pub mod exclusion;
pub mod installation;
pub mod unity;
pub mod repackage;
