//! The Java debugger plugin context.
//!
//! Everything the host IDE owns while the plugin is active lives here:
//! the controller, the per-project configurations and the persisted
//! breakpoint state. The context is created on activation and torn down on
//! deactivation; there is no process-wide mutable state.

use std::path::{Path, PathBuf};

use config::{ConfigurationStore, JavaConfiguration};
use debugger::ide::{EditorMarks, ProjectResolver};
use debugger::{Debugger, Event};
use eyre::WrapErr;

/// Name of the external debuggee launcher on the PATH.
pub const DEBUGGER_PROGRAM: &str = "codeslayer-jdebugger";

pub struct PluginContext {
    debugger: Debugger,
    configurations: ConfigurationStore,
    state: state::StateManager,
}

impl PluginContext {
    /// Activate the plugin: load configurations, restore the persisted
    /// breakpoints and create an idle controller.
    pub fn activate(
        configuration_file: impl Into<PathBuf>,
        state_file: impl Into<PathBuf>,
        resolver: Box<dyn ProjectResolver>,
    ) -> eyre::Result<Self> {
        let configurations = ConfigurationStore::load_from(configuration_file);
        let state = state::StateManager::new(state_file).wrap_err("loading saved breakpoints")?;

        let debugger = Debugger::new(resolver);
        for breakpoint in &state.current().breakpoints {
            debugger.restore_breakpoint(breakpoint.clone());
        }

        Ok(Self {
            debugger,
            configurations,
            state,
        })
    }

    /// Deactivate the plugin: quit a running debuggee and persist the
    /// breakpoints for the next session.
    pub fn deactivate(mut self) -> eyre::Result<()> {
        self.debugger.quit();
        self.state.set_breakpoints(self.debugger.breakpoints());
        let _ = self.state.save().wrap_err("saving breakpoints")?;
        Ok(())
    }

    /// Subscribe to the controller's events; the host drains these on its
    /// main loop.
    pub fn events(&self) -> crossbeam_channel::Receiver<Event> {
        self.debugger.events()
    }

    pub fn debugger(&self) -> &Debugger {
        &self.debugger
    }

    pub fn configurations(&self) -> &ConfigurationStore {
        &self.configurations
    }

    pub fn configurations_mut(&mut self) -> &mut ConfigurationStore {
        &mut self.configurations
    }

    /// Launch (or relaunch) a debugging session for the given project.
    pub fn start_debugging(&self, project_key: &str) -> eyre::Result<()> {
        let configuration = self
            .configurations
            .find_configuration(project_key)
            .ok_or_else(|| eyre::eyre!("no Java configuration for project {project_key}"))?;
        self.debugger.start(&launch_command(configuration))
    }

    /// A `.java` editor was opened: enable its breakpoint gutter and
    /// recreate the marks for breakpoints already known for its class.
    pub fn on_editor_opened(&self, editor: &dyn EditorMarks, project_key: &str) {
        match self.class_name_for(editor.file_path(), project_key) {
            Some(class_name) => self.debugger.attach_editor(editor, &class_name),
            None => {
                tracing::debug!(
                    path = %editor.file_path().display(),
                    "editor outside the configured folders; gutter only"
                );
                editor.enable_gutter();
            }
        }
    }

    /// The editor went away; only the UI affordance is torn down, the
    /// breakpoints themselves survive.
    pub fn on_editor_closed(&self, editor: &dyn EditorMarks) {
        self.debugger.detach_editor(editor);
    }

    /// A breakpoint gutter gesture on `line_number`. Declines when no class
    /// name can be determined for the document.
    pub fn on_toggle_gesture(
        &self,
        editor: &dyn EditorMarks,
        project_key: &str,
        line_number: usize,
    ) {
        let Some(class_name) = self.class_name_for(editor.file_path(), project_key) else {
            tracing::warn!(
                path = %editor.file_path().display(),
                project_key,
                "cannot determine a class name; breakpoint not recorded"
            );
            return;
        };
        self.debugger
            .toggle_breakpoint(editor, &class_name, line_number);
    }

    fn class_name_for(&self, path: &Path, project_key: &str) -> Option<String> {
        self.configurations
            .find_configuration(project_key)?
            .class_name_for_path(path)
    }
}

/// Build the debuggee launcher argv from a project configuration.
pub fn launch_command(configuration: &JavaConfiguration) -> Vec<String> {
    let mut command = vec![DEBUGGER_PROGRAM.to_string()];

    let sourcepath = join_paths(
        configuration
            .source_folders
            .iter()
            .chain(configuration.test_folders.iter()),
    );
    if !sourcepath.is_empty() {
        command.push("-sourcepath".to_string());
        command.push(sourcepath);
    }

    let classpath = join_paths(
        configuration
            .build_folder
            .iter()
            .chain(configuration.lib_folders.iter()),
    );
    if !classpath.is_empty() {
        command.push("-classpath".to_string());
        command.push(classpath);
    }

    command
}

fn join_paths<'a>(paths: impl Iterator<Item = &'a PathBuf>) -> String {
    paths
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(":")
}
