//! Installed runtime registry.
//!
//! Runtimes come from `[[runtimes]]` in the project config. A project picks
//! one by name through its `runtime` key and otherwise builds against the
//! runtime flagged `default`.

use crate::models::runtime::Runtime;
use glob::{glob, Pattern};

pub struct RuntimeManager {
    runtimes: Vec<Runtime>,
    project_runtime: Option<String>,
}

impl RuntimeManager {
    pub fn new(runtimes: Vec<Runtime>, project_runtime: Option<String>) -> Self {
        RuntimeManager {
            runtimes,
            project_runtime,
        }
    }

    pub fn configured_runtimes(&self) -> &[Runtime] {
        &self.runtimes
    }

    /// First runtime flagged `default`.
    pub fn default_runtime(&self) -> Option<&Runtime> {
        self.runtimes.iter().find(|r| r.default)
    }

    pub fn find(&self, name: &str) -> Option<&Runtime> {
        self.runtimes.iter().find(|r| r.name == name)
    }

    /// The selected runtime unless `use_default` is set or nothing is selected.
    pub fn effective_runtime<'a>(
        &'a self,
        selected: Option<&'a Runtime>,
        use_default: bool,
    ) -> Option<&'a Runtime> {
        match selected {
            Some(rt) if !use_default => Some(rt),
            _ => self.default_runtime(),
        }
    }

    /// Runtime named by the project, falling back to the default.
    pub fn project_runtime(&self) -> Option<&Runtime> {
        let selected = self.project_runtime.as_deref().and_then(|n| {
            let found = self.find(n);
            if found.is_none() {
                log::warn!("project runtime '{}' is not configured; using default", n);
            }
            found
        });
        self.effective_runtime(selected, false)
    }

    /// The project runtime as handed to the compiler. A runtime that lists
    /// no jars but has an install path gets them recognized from that path.
    pub fn build_runtime(&self) -> Option<Runtime> {
        let mut rt = self.project_runtime()?.clone();
        if rt.jars.is_empty() && rt.path.is_some() {
            recognize_jars(&mut rt);
            log::debug!("runtime '{}': {} jar(s) recognized", rt.name, rt.jars.len());
        }
        Some(rt)
    }

    /// Make `name` the only default runtime. Returns false if unknown.
    pub fn set_default(&mut self, name: &str) -> bool {
        if self.find(name).is_none() {
            return false;
        }
        for rt in &mut self.runtimes {
            rt.default = rt.name == name;
        }
        true
    }

    /// Fill `jars` of runtime `name` from its install path.
    pub fn recognize_jars_for(&mut self, name: &str) -> Option<&Runtime> {
        let rt = self.runtimes.iter_mut().find(|r| r.name == name)?;
        recognize_jars(rt);
        Some(&*rt)
    }
}

/// Replace `runtime.jars` with every `*.jar` under its path, sorted.
pub fn recognize_jars(runtime: &mut Runtime) {
    let Some(path) = runtime.path.as_deref() else {
        runtime.jars.clear();
        return;
    };
    let pattern = format!("{}/**/*.jar", Pattern::escape(path));
    let mut jars: Vec<String> = match glob(&pattern) {
        Ok(paths) => paths
            .filter_map(Result::ok)
            .map(|p| p.to_string_lossy().to_string())
            .collect(),
        Err(e) => {
            log::warn!("cannot scan runtime '{}': {}", runtime.name, e);
            Vec::new()
        }
    };
    jars.sort();
    runtime.jars = jars;
}
