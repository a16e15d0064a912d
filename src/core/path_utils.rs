/*
 * This module provides utility functions for locating application-specific
 * directories. The site configuration lives in the platform's local
 * configuration directory unless a path is given explicitly.
 */
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const SITE_CONFIG_FILENAME: &str = "site.json";

/*
 * Retrieves the application's local (non-roaming) configuration directory,
 * e.g. `~/.config/<app_name>` on Linux. Nothing is created on disk; the
 * directory is only read from.
 *
 * Returns `None` when `ProjectDirs` cannot identify a home directory.
 */
pub fn get_base_app_config_local_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Getting base app config local dir for '{app_name}'");
    ProjectDirs::from("", "", app_name).map(|proj_dirs| proj_dirs.config_local_dir().to_path_buf())
}

/*
 * Default location of the site configuration file for `app_name`.
 */
pub fn default_site_config_path(app_name: &str) -> Option<PathBuf> {
    get_base_app_config_local_dir(app_name).map(|dir| dir.join(SITE_CONFIG_FILENAME))
}

/*
 * Resolves a path from the configuration file. Relative paths are taken
 * relative to the directory holding the configuration file so a site can be
 * moved as a unit.
 */
pub fn resolve_config_relative(config_path: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        return value.to_path_buf();
    }
    config_path
        .parent()
        .map(|dir| dir.join(value))
        .unwrap_or_else(|| value.to_path_buf())
}
