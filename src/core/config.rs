/*
 * Loads the site configuration: where project content lives, where the health
 * record store lives, and which projects exist. The result is the immutable
 * `SiteCatalog` shared read-only by every request for the lifetime of the
 * process.
 *
 * It uses a trait-based approach (`ConfigManagerOperations`) so callers can
 * substitute an in-memory configuration in tests. The concrete
 * `CoreConfigManager` reads a JSON file from disk.
 */
use super::models::{PRIVATE_ROOT_NAME, PUBLIC_ROOT_NAME, Project};
use super::path_utils;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoConfigDirectory,
    DuplicateProject(String),
    InvalidProjectId(String),
    InvalidRootName(String),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::Serde(e) => write!(f, "Configuration parse error: {e}"),
            ConfigError::NoConfigDirectory => {
                write!(f, "Could not determine the configuration directory")
            }
            ConfigError::DuplicateProject(id) => write!(f, "Project '{id}' is declared twice"),
            ConfigError::InvalidProjectId(id) => write!(
                f,
                "Invalid project id: {id:?}. Use letters, numbers, '_' or '-'."
            ),
            ConfigError::InvalidRootName(name) => {
                write!(f, "Invalid root directory name: {name:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn default_docs_dir() -> String {
    PUBLIC_ROOT_NAME.to_string()
}

fn default_data_dir() -> String {
    PRIVATE_ROOT_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_docs_dir")]
    pub docs_dir: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Name of a built-in virtual page set to attach, e.g. `"fitness"`.
    #[serde(default)]
    pub virtual_pages: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub content_root: PathBuf,
    pub store_dir: PathBuf,
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

pub fn is_valid_project_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

fn is_valid_root_name(name: &str) -> bool {
    is_valid_project_id(name) && !name.starts_with('-')
}

/*
 * Immutable project table built from a `SiteConfig`. Lookup is by id;
 * iteration follows the order projects were declared in.
 */
#[derive(Debug, Clone, Default)]
pub struct SiteCatalog {
    projects: Vec<Project>,
    index: HashMap<String, usize>,
}

impl SiteCatalog {
    pub fn new(projects: Vec<Project>) -> Result<Self> {
        let mut index = HashMap::new();
        for (position, project) in projects.iter().enumerate() {
            if !is_valid_project_id(&project.id) {
                return Err(ConfigError::InvalidProjectId(project.id.clone()));
            }
            if index.insert(project.id.clone(), position).is_some() {
                return Err(ConfigError::DuplicateProject(project.id.clone()));
            }
        }
        Ok(SiteCatalog { projects, index })
    }

    /*
     * Builds the catalog from a parsed configuration. Each project directory
     * is `<content_root>/<id>`.
     */
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        let mut projects = Vec::with_capacity(config.projects.len());
        for entry in &config.projects {
            for root in [&entry.docs_dir, &entry.data_dir] {
                if !is_valid_root_name(root) {
                    return Err(ConfigError::InvalidRootName(root.clone()));
                }
            }
            if entry.docs_dir == entry.data_dir {
                return Err(ConfigError::InvalidRootName(entry.data_dir.clone()));
            }

            let mut project = Project::new(entry.id.clone(), config.content_root.join(&entry.id));
            if let Some(title) = &entry.title {
                project.title = title.clone();
            }
            project.description = entry.description.clone();
            project.public_root = entry.docs_dir.clone();
            project.private_root = entry.data_dir.clone();
            projects.push(project);
        }
        SiteCatalog::new(projects)
    }

    pub fn get(&self, project_id: &str) -> Option<&Project> {
        self.index.get(project_id).map(|&i| &self.projects[i])
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }
}

pub trait ConfigManagerOperations: Send + Sync {
    fn load_site_config(&self, config_path: &Path) -> Result<SiteConfig>;
    fn default_config_path(&self, app_name: &str) -> Result<PathBuf>;
}

pub struct CoreConfigManager {}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {}
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    /*
     * Reads `site.json`. Relative `content_root` and `store_dir` values are
     * resolved against the configuration file's directory. Project ids are
     * validated when the `SiteCatalog` is built from the result.
     */
    fn load_site_config(&self, config_path: &Path) -> Result<SiteConfig> {
        log::trace!("CoreConfigManager: Loading site configuration from {config_path:?}");
        let file = File::open(config_path)?;
        let reader = BufReader::new(file);
        let mut config: SiteConfig = serde_json::from_reader(reader)?;

        config.content_root = path_utils::resolve_config_relative(config_path, &config.content_root);
        config.store_dir = path_utils::resolve_config_relative(config_path, &config.store_dir);

        log::debug!(
            "CoreConfigManager: Loaded {} projects (content root {:?}, store {:?}).",
            config.projects.len(),
            config.content_root,
            config.store_dir
        );
        Ok(config)
    }

    fn default_config_path(&self, app_name: &str) -> Result<PathBuf> {
        path_utils::default_site_config_path(app_name).ok_or(ConfigError::NoConfigDirectory)
    }
}
