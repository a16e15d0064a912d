use clap::{Parser, Subcommand};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use site_pages::core::response::{content_response, listing_response};
use site_pages::core::virtual_pages::FITNESS_PAGE_SET;
use site_pages::core::{
    AccessContext, ConfigError, ConfigManagerOperations, ContentError, ContentRendererOperations,
    CoreConfigManager, CoreContentRenderer, CorePathResolver, CoreProjectFileManager, EntryRef,
    JsonHealthStore, ProjectFileManagerOperations, RegistryError, SiteCatalog, UserId,
    VirtualPageRegistry,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

const APP_NAME: &str = "site_pages";

#[derive(Debug, Parser)]
#[command(name = APP_NAME, about = "Browse project pages the way the site serves them")]
struct Cli {
    /// Path to site.json. Defaults to the platform configuration directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List configured projects.
    Projects,
    /// Print the entries of a project.
    List {
        project: String,
        /// Act as this authenticated user.
        #[arg(long)]
        user: Option<String>,
        /// Print the navigation HTML instead of one entry per line.
        #[arg(long)]
        html: bool,
    },
    /// Print the rendered HTML of one entry (`virtual:<id>` for virtual pages).
    Show {
        project: String,
        entry: String,
        /// Act as this authenticated user.
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Registry(RegistryError),
    Content(ContentError),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Config(err)
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        CliError::Registry(err)
    }
}

impl From<ContentError> for CliError {
    fn from(err: ContentError) -> Self {
        CliError::Content(err)
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {e}"),
            CliError::Registry(e) => write!(f, "Virtual page setup failed: {e}"),
            CliError::Content(e) => write!(f, "{}", e.user_message()),
        }
    }
}

fn access_for(user: Option<String>) -> AccessContext {
    match user {
        Some(id) => AccessContext::authenticated(UserId::new(id)),
        None => AccessContext::anonymous(),
    }
}

fn build_manager(
    config_manager: &dyn ConfigManagerOperations,
    config_path: Option<PathBuf>,
) -> Result<CoreProjectFileManager, CliError> {
    let config_path = match config_path {
        Some(path) => path,
        None => config_manager.default_config_path(APP_NAME)?,
    };
    let config = config_manager.load_site_config(&config_path)?;
    let catalog = SiteCatalog::from_config(&config)?;

    let store = Arc::new(JsonHealthStore::new(config.store_dir.clone()));
    log::debug!("Main: Health store at {:?}", store.store_dir());

    let renderer: Arc<dyn ContentRendererOperations> = Arc::new(CoreContentRenderer::new());
    let mut registry = VirtualPageRegistry::new(Arc::clone(&renderer));
    for project in &config.projects {
        match project.virtual_pages.as_deref() {
            Some(FITNESS_PAGE_SET) => {
                registry.register_fitness_pages(&project.id, store.clone())?;
            }
            Some(other) => log::warn!(
                "Main: Project '{}' asks for unknown virtual page set '{other}', ignoring.",
                project.id
            ),
            None => {}
        }
    }

    Ok(CoreProjectFileManager::new(
        Arc::new(catalog),
        Arc::new(CorePathResolver::new()),
        Arc::new(registry),
        renderer,
    ))
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let manager = build_manager(&CoreConfigManager::new(), cli.config)?;

    match cli.command {
        Command::Projects => {
            for project in manager.catalog().projects() {
                if project.description.is_empty() {
                    println!("{}\t{}", project.id, project.title);
                } else {
                    println!("{}\t{}\t{}", project.id, project.title, project.description);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::List {
            project,
            user,
            html,
        } => {
            let access = access_for(user);
            if html {
                let response = listing_response(&project, manager.list_entries(&project, &access));
                if !response.is_success() {
                    eprintln!("{} ({})", response.body, response.status);
                    return Ok(ExitCode::FAILURE);
                }
                println!("{}", response.body);
                return Ok(ExitCode::SUCCESS);
            }
            for entry in manager.list_entries(&project, &access)? {
                match entry.modified_display() {
                    Some(modified) => println!("{}\t{}\t{modified}", entry.entry_ref(), entry.title()),
                    None => println!("{}\t{}", entry.entry_ref(), entry.title()),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Show {
            project,
            entry,
            user,
        } => {
            let access = access_for(user);
            let response =
                content_response(manager.get_content(&project, &EntryRef::parse(&entry), &access));
            if response.is_success() {
                println!("{}", response.body);
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("{} ({})", response.body, response.status);
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if let Err(e) = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed to initialize logger: {e}");
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("Main: {e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_pages::core::FileEntry;
    use std::fs;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        fs::write(path, content).expect("Failed to write fixture file");
    }

    fn write_site() -> (TempDir, PathBuf) {
        let dir = tempdir().expect("Failed to create temp dir");
        let config_path = dir.path().join("site.json");
        write_file(
            &config_path,
            r#"{
                "content_root": "content",
                "store_dir": "store",
                "projects": [
                    {"id": "Health_and_Fitness", "virtual_pages": "fitness"},
                    {"id": "AI_Learning", "virtual_pages": "sleep"}
                ]
            }"#,
        );
        write_file(
            &dir.path().join("content/Health_and_Fitness/docs/plan.md"),
            "# Plan\n",
        );
        write_file(
            &dir.path().join("content/AI_Learning/docs/checklist.md"),
            "- [ ] Read\n",
        );
        write_file(
            &dir.path().join("store/alice.json"),
            r#"{"workouts": [{"date": "2025-03-02", "workout_type": "Strength", "exercises": ["Deadlift"]}]}"#,
        );
        (dir, config_path)
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("Arguments should parse")
    }

    #[test]
    fn test_build_manager_wires_config_store_and_pages() {
        // Arrange
        let (_dir, config_path) = write_site();

        // Act
        let manager = build_manager(&CoreConfigManager::new(), Some(config_path)).unwrap();
        let alice = access_for(Some("alice".to_string()));
        let entries = manager.list_entries("Health_and_Fitness", &alice).unwrap();
        let workouts = manager
            .get_content(
                "Health_and_Fitness",
                &EntryRef::parse("virtual:workout-log"),
                &alice,
            )
            .unwrap();

        // Assert
        assert_eq!(entries.len(), 6);
        assert!(matches!(&entries[0], FileEntry::RealFile { relative_path, .. } if relative_path == "plan.md"));
        assert!(workouts.html.contains("Deadlift"));
    }

    #[test]
    fn test_unknown_virtual_page_set_is_ignored() {
        let (_dir, config_path) = write_site();

        let manager = build_manager(&CoreConfigManager::new(), Some(config_path)).unwrap();
        let entries = manager
            .list_entries("AI_Learning", &access_for(Some("alice".to_string())))
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert!(entries.iter().all(|e| !e.is_virtual()));
    }

    #[test]
    fn test_missing_config_is_a_config_error() {
        let dir = tempdir().unwrap();

        let result = build_manager(
            &CoreConfigManager::new(),
            Some(dir.path().join("missing.json")),
        );

        assert!(matches!(result, Err(CliError::Config(ConfigError::Io(_)))));
    }

    #[test]
    fn test_commands_exit_codes() {
        let (_dir, config_path) = write_site();
        let config = config_path.to_string_lossy().into_owned();

        let projects = run(cli(&["site_pages", "--config", &config, "projects"])).unwrap();
        let list = run(cli(&[
            "site_pages",
            "list",
            "Health_and_Fitness",
            "--user",
            "alice",
            "--config",
            &config,
        ]))
        .unwrap();
        let list_html = run(cli(&[
            "site_pages",
            "--config",
            &config,
            "list",
            "Health_and_Fitness",
            "--html",
        ]))
        .unwrap();
        let show = run(cli(&[
            "site_pages",
            "--config",
            &config,
            "show",
            "Health_and_Fitness",
            "plan.md",
        ]))
        .unwrap();
        let show_private = run(cli(&[
            "site_pages",
            "--config",
            &config,
            "show",
            "Health_and_Fitness",
            "virtual:workout-log",
        ]))
        .unwrap();

        assert_eq!(projects, ExitCode::SUCCESS);
        assert_eq!(list, ExitCode::SUCCESS);
        assert_eq!(list_html, ExitCode::SUCCESS);
        assert_eq!(show, ExitCode::SUCCESS);
        assert_eq!(show_private, ExitCode::FAILURE);
    }

    #[test]
    fn test_listing_unknown_project_is_an_error() {
        let (_dir, config_path) = write_site();
        let config = config_path.to_string_lossy().into_owned();

        let result = run(cli(&["site_pages", "--config", &config, "list", "Nope"]));

        match result {
            Err(CliError::Content(err)) => assert!(err.is_not_found()),
            other => panic!("Expected a not-found content error, got {other:?}"),
        }
    }
}
