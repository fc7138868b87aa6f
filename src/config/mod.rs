use crate::analyze::AnalyzeTask;
use crate::cli::RunArgs;
use crate::format::FormatTask;
use crate::imports::FixImportsTask;
use crate::process::ProcessRunner;
use crate::task::Task;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("package directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {}: {source}", .path.display())]
    Pubspec {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("fixing imports needs a package name, but {} has none", .0.display())]
    MissingPackageName(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Default, Deserialize)]
struct Pubspec {
    name: Option<String>,
    dart_precommit: Option<Settings>,
}

/// Optional `dart_precommit:` section of `pubspec.yaml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct Settings {
    fix_imports: Option<bool>,
    format: Option<bool>,
    analyze: Option<bool>,
    continue_on_rejected: Option<bool>,
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig {
    /// Absolute package root.
    pub package_dir: PathBuf,
    pub package_name: Option<String>,
    pub fix_imports: bool,
    pub format: bool,
    pub analyze: bool,
    pub continue_on_rejected: bool,
}

impl HookConfig {
    /// Combine `pubspec.yaml` in `args.directory` with the command line.
    /// Command line flags win.
    pub fn load(args: &RunArgs) -> Result<Self> {
        let package_dir = fs::canonicalize(&args.directory)
            .map_err(|_| ConfigError::MissingDirectory(args.directory.clone()))?;
        let pubspec = read_pubspec(&package_dir.join("pubspec.yaml"))?;
        let settings = pubspec.dart_precommit.unwrap_or_default();

        Ok(Self {
            package_name: pubspec.name,
            fix_imports: !args.no_fix_imports && settings.fix_imports.unwrap_or(true),
            format: !args.no_format && settings.format.unwrap_or(true),
            analyze: !args.no_analyze && settings.analyze.unwrap_or(true),
            continue_on_rejected: args.continue_on_rejected
                || settings.continue_on_rejected.unwrap_or(false),
            package_dir,
        })
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.package_dir.join("lib")
    }

    /// Enabled tasks in execution order.
    pub fn tasks(&self, runner: Rc<dyn ProcessRunner>) -> Result<Vec<Task>> {
        let mut tasks = Vec::new();
        if self.fix_imports {
            let name = self
                .package_name
                .as_deref()
                .ok_or_else(|| ConfigError::MissingPackageName(self.package_dir.join("pubspec.yaml")))?;
            tasks.push(Task::File(Box::new(FixImportsTask::new(name, self.lib_dir()))));
        }
        if self.format {
            tasks.push(Task::File(Box::new(FormatTask::new(runner.clone()))));
        }
        if self.analyze {
            tasks.push(Task::Repo(Box::new(AnalyzeTask::new(runner))));
        }
        Ok(tasks)
    }
}

fn read_pubspec(path: &Path) -> Result<Pubspec> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Pubspec::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Pubspec {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::SystemProcess;
    use clap::Parser;

    fn args(dir: &Path, extra: &[&str]) -> RunArgs {
        let mut argv = vec!["dart-precommit", "-d", dir.to_str().unwrap()];
        argv.extend_from_slice(extra);
        crate::cli::Cli::try_parse_from(argv).unwrap().run
    }

    fn write_pubspec(dir: &Path, content: &str) {
        fs::write(dir.join("pubspec.yaml"), content).unwrap();
    }

    #[test]
    fn defaults_enable_everything() {
        let dir = tempfile::tempdir().unwrap();
        write_pubspec(dir.path(), "name: my_pkg\nversion: 1.0.0\n");

        let config = HookConfig::load(&args(dir.path(), &[])).unwrap();
        assert_eq!(config.package_name.as_deref(), Some("my_pkg"));
        assert!(config.fix_imports && config.format && config.analyze);
        assert!(!config.continue_on_rejected);
        assert!(config.package_dir.is_absolute());
        assert!(config.lib_dir().ends_with("lib"));
    }

    #[test]
    fn pubspec_section_sets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        write_pubspec(
            dir.path(),
            "name: my_pkg\ndart_precommit:\n  analyze: false\n  continue-on-rejected: true\n",
        );

        let config = HookConfig::load(&args(dir.path(), &[])).unwrap();
        assert!(!config.analyze);
        assert!(config.format);
        assert!(config.continue_on_rejected);
    }

    #[test]
    fn command_line_overrides_pubspec() {
        let dir = tempfile::tempdir().unwrap();
        write_pubspec(dir.path(), "name: my_pkg\ndart_precommit:\n  format: true\n");

        let config = HookConfig::load(&args(dir.path(), &["--no-format"])).unwrap();
        assert!(!config.format);
    }

    #[test]
    fn empty_section_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        write_pubspec(dir.path(), "name: my_pkg\ndart_precommit:\n");
        assert!(HookConfig::load(&args(dir.path(), &[])).is_ok());
    }

    #[test]
    fn invalid_pubspec_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_pubspec(dir.path(), "name: [unclosed\n");
        assert!(matches!(
            HookConfig::load(&args(dir.path(), &[])),
            Err(ConfigError::Pubspec { .. })
        ));
    }

    #[test]
    fn fix_imports_needs_package_name() {
        let dir = tempfile::tempdir().unwrap();
        let config = HookConfig::load(&args(dir.path(), &[])).unwrap();
        let runner = Rc::new(SystemProcess::new(dir.path()));

        assert!(matches!(
            config.tasks(runner.clone()),
            Err(ConfigError::MissingPackageName(_))
        ));

        let config = HookConfig::load(&args(dir.path(), &["--no-fix-imports"])).unwrap();
        let tasks = config.tasks(runner).unwrap();
        let names: Vec<&str> = tasks.iter().map(Task::name).collect();
        assert_eq!(names, vec!["format", "analyze"]);
    }

    #[test]
    fn tasks_are_registered_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_pubspec(dir.path(), "name: my_pkg\n");
        let config = HookConfig::load(&args(dir.path(), &[])).unwrap();

        let tasks = config.tasks(Rc::new(SystemProcess::new(dir.path()))).unwrap();
        assert!(matches!(tasks[0], Task::File(_)));
        assert!(matches!(tasks[2], Task::Repo(_)));
        let names: Vec<&str> = tasks.iter().map(Task::name).collect();
        assert_eq!(names, vec!["fix-imports", "format", "analyze"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            HookConfig::load(&args(&missing, &[])),
            Err(ConfigError::MissingDirectory(_))
        ));
    }
}
