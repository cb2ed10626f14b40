//! Runtime schema: an installed rule-engine distribution configured under
//! `[[runtimes]]`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Metadata for one installed runtime.
///
/// The name, not the version, identifies a runtime: two runtimes may ship
/// the same version from different locations.
pub struct Runtime {
    pub name: String,
    #[serde(default)]
    pub version: String,
    /// Product family, e.g. "drools", "jbpm" or "kie".
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub jars: Vec<String>,
}

impl Runtime {
    /// Jars joined with the platform classpath separator.
    pub fn classpath(&self) -> String {
        let sep = if cfg!(windows) { ";" } else { ":" };
        self.jars.join(sep)
    }
}
