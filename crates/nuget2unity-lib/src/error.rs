//! Library error type.

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("JSON error: {0}")]
	SerdeJSON(#[from] serde_json::Error),
	#[error("parsing error: {0}")]
	Parse(String),
	#[error("registry error: {0}")]
	Registry(#[from] crate::registry::RegistryError),
	#[error("dependency walk failed: {0}")]
	Walk(#[from] crate::dependency_walker::WalkError),
	#[error("resolver failed: {0}")]
	Resolve(#[from] crate::resolver::ResolveError),
	#[error("{0}")]
	Materialize(#[from] crate::installation::MaterializeError),
	#[error("unity package error: {0}")]
	UnityPackage(#[from] crate::unity::UnityPackageError),
}
