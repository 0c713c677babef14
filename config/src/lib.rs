//! Per-project Java configuration: folder roots and build settings, with
//! lookup by project key and class-name resolution from source paths.

use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

use eyre::WrapErr;
use serde::{Deserialize, Serialize};

/// The properties the plugin keeps for one Java project.
#[derive(Default, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JavaConfiguration {
    /// Key of the owning project, as the host IDE identifies it.
    pub project_key: String,
    pub source_folders: Vec<PathBuf>,
    pub test_folders: Vec<PathBuf>,
    pub lib_folders: Vec<PathBuf>,
    /// Compiled classes output folder.
    pub build_folder: Option<PathBuf>,
    /// The project's Ant build file.
    pub build_file: Option<PathBuf>,
}

impl JavaConfiguration {
    /// Derive the fully qualified class name for a source path, trying the
    /// source folders then the test folders.
    ///
    /// `None` when the path falls under no configured root; callers decline
    /// to record a breakpoint in that case rather than storing an empty
    /// class name.
    pub fn class_name_for_path(&self, path: &Path) -> Option<String> {
        self.source_folders
            .iter()
            .chain(self.test_folders.iter())
            .find_map(|root| class_name_under_root(root, path))
    }
}

fn class_name_under_root(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str()?),
            _ => return None,
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("."))
}

/// The JSON-backed collection of per-project configurations.
pub struct ConfigurationStore {
    save_path: PathBuf,
    configurations: Vec<JavaConfiguration>,
}

impl ConfigurationStore {
    /// Load the store from `path`. A missing or unreadable file yields an
    /// empty store rather than an error; the file appears on the first save.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match std::fs::File::open(&path) {
            Ok(f) => match load(f) {
                Ok(configurations) => Self {
                    save_path: path,
                    configurations,
                },
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "unreadable configuration file");
                    Self {
                        save_path: path,
                        configurations: Vec::new(),
                    }
                }
            },
            Err(e) => {
                tracing::debug!(error = %e, path = %path.display(), "no configuration file yet");
                Self {
                    save_path: path,
                    configurations: Vec::new(),
                }
            }
        }
    }

    pub fn find_configuration(&self, project_key: &str) -> Option<&JavaConfiguration> {
        self.configurations
            .iter()
            .find(|c| c.project_key == project_key)
    }

    /// Insert or replace the configuration for its project key.
    pub fn put(&mut self, configuration: JavaConfiguration) {
        match self
            .configurations
            .iter_mut()
            .find(|c| c.project_key == configuration.project_key)
        {
            Some(existing) => *existing = configuration,
            None => self.configurations.push(configuration),
        }
    }

    pub fn save(&self) -> eyre::Result<()> {
        let f = std::fs::File::create(&self.save_path)
            .wrap_err("creating configuration file")?;
        save(&self.configurations, &f).wrap_err("saving configurations")?;
        Ok(())
    }
}

pub fn save(configurations: &[JavaConfiguration], writer: impl Write) -> eyre::Result<()> {
    serde_json::to_writer_pretty(writer, configurations).wrap_err("encoding configurations")?;
    Ok(())
}

pub fn load(reader: impl Read) -> eyre::Result<Vec<JavaConfiguration>> {
    let configurations = serde_json::from_reader(reader).wrap_err("reading configurations")?;
    Ok(configurations)
}
