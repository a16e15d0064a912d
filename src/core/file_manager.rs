use super::config::SiteCatalog;
use super::health_store::DataStoreError;
use super::models::{
    AccessContext, ContentKind, EntryRef, FileEntry, Project, RenderedContent, humanize_title,
};
use super::path_resolver::{BoundaryError, PathResolverOperations, is_markdown_file_name};
use super::renderer::{ContentRendererOperations, first_heading};
use super::virtual_pages::{VirtualPageError, VirtualPageRegistry};
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;

/*
 * The project file manager composes the path resolver, the virtual page
 * registry and the content renderer into the two operations the web layer
 * calls: listing a project's visible entries and rendering one entry.
 *
 * Every call takes an explicit `AccessContext`; nothing here depends on
 * process-wide state, and the only shared state is the immutable catalog and
 * registry.
 */

/*
 * Errors surfaced to the web layer. `Boundary` and `NotFound` display the same
 * way so a caller cannot tell a traversal attempt from a missing page.
 */
#[derive(Debug)]
pub enum ContentError {
    Boundary(BoundaryError),
    NotFound(String),
    DataUnavailable {
        page: String,
        source: DataStoreError,
    },
    Io(io::Error),
    Scan(ignore::Error),
}

impl ContentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::Boundary(_) | ContentError::NotFound(_))
    }

    /*
     * Message safe to show to the visitor. It never includes paths or store
     * details.
     */
    pub fn user_message(&self) -> String {
        match self {
            ContentError::Boundary(_) | ContentError::NotFound(_) => "Page not found.".to_string(),
            ContentError::DataUnavailable { page, .. } => {
                format!("{page} is temporarily unavailable. Please try again later.")
            }
            ContentError::Io(_) | ContentError::Scan(_) => {
                "Something went wrong while loading this page.".to_string()
            }
        }
    }
}

impl From<BoundaryError> for ContentError {
    fn from(err: BoundaryError) -> Self {
        ContentError::Boundary(err)
    }
}

impl From<VirtualPageError> for ContentError {
    fn from(err: VirtualPageError) -> Self {
        match err {
            VirtualPageError::NotFound(id) => ContentError::NotFound(id),
            VirtualPageError::DataUnavailable { page, source } => {
                ContentError::DataUnavailable { page, source }
            }
        }
    }
}

impl From<io::Error> for ContentError {
    fn from(err: io::Error) -> Self {
        ContentError::Io(err)
    }
}

impl From<ignore::Error> for ContentError {
    fn from(err: ignore::Error) -> Self {
        ContentError::Scan(err)
    }
}

impl std::fmt::Display for ContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentError::Boundary(e) => write!(f, "Entry not found: {}", e.requested),
            ContentError::NotFound(entry) => write!(f, "Entry not found: {entry}"),
            ContentError::DataUnavailable { page, source } => {
                write!(f, "Data for '{page}' is unavailable: {source}")
            }
            ContentError::Io(e) => write!(f, "I/O error: {e}"),
            ContentError::Scan(e) => write!(f, "Directory scan error: {e}"),
        }
    }
}

impl std::error::Error for ContentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContentError::DataUnavailable { source, .. } => Some(source),
            ContentError::Io(e) => Some(e),
            ContentError::Scan(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ContentError>;

pub trait ProjectFileManagerOperations: Send + Sync {
    /*
     * Lists the entries of `project_id` visible to `access`: real markdown files
     * of each permitted root (one level deep, sorted by name, public root
     * first), followed by the project's virtual pages in declared order.
     */
    fn list_entries(&self, project_id: &str, access: &AccessContext) -> Result<Vec<FileEntry>>;

    /*
     * Renders one entry. Real files go through the markdown renderer, virtual
     * pages through the registry. Anything not visible to `access` is
     * `NotFound` (or a `Boundary` error, which presents identically).
     */
    fn get_content(
        &self,
        project_id: &str,
        entry: &EntryRef,
        access: &AccessContext,
    ) -> Result<RenderedContent>;
}

pub struct CoreProjectFileManager {
    catalog: Arc<SiteCatalog>,
    resolver: Arc<dyn PathResolverOperations>,
    registry: Arc<VirtualPageRegistry>,
    renderer: Arc<dyn ContentRendererOperations>,
}

impl CoreProjectFileManager {
    pub fn new(
        catalog: Arc<SiteCatalog>,
        resolver: Arc<dyn PathResolverOperations>,
        registry: Arc<VirtualPageRegistry>,
        renderer: Arc<dyn ContentRendererOperations>,
    ) -> Self {
        CoreProjectFileManager {
            catalog,
            resolver,
            registry,
            renderer,
        }
    }

    pub fn catalog(&self) -> &SiteCatalog {
        &self.catalog
    }

    fn project(&self, project_id: &str) -> Result<&Project> {
        self.catalog.get(project_id).ok_or_else(|| {
            log::debug!("ProjectFileManager: Unknown project '{project_id}'.");
            ContentError::NotFound(project_id.to_string())
        })
    }

    /*
     * Direct children of one root that are visible markdown files, sorted by
     * file name. Hidden files, directories and symlinks are skipped.
     */
    fn scan_root(project: &Project, root_name: &str) -> Result<Vec<FileEntry>> {
        let root_dir = project.root_dir(root_name);
        if !root_dir.is_dir() {
            log::debug!(
                "ProjectFileManager: Root {root_dir:?} of project '{}' does not exist, skipping.",
                project.id
            );
            return Ok(Vec::new());
        }

        let mut walker_builder = WalkBuilder::new(&root_dir);
        walker_builder
            .standard_filters(false) // Content visibility is decided by root, not by ignore files.
            .hidden(true)
            .max_depth(Some(1))
            .sort_by_file_name(|a, b| a.cmp(b));

        let mut entries = Vec::new();
        for entry_result in walker_builder.build() {
            let entry = entry_result?;
            if entry.depth() == 0 {
                continue;
            }
            let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_file || !is_markdown_file_name(&name) {
                log::trace!("ProjectFileManager: Skipping {:?} in listing.", entry.path());
                continue;
            }

            let modified = entry
                .metadata()
                .ok()
                .and_then(|meta| meta.modified().ok())
                .map(OffsetDateTime::from);
            entries.push(FileEntry::RealFile {
                root: root_name.to_string(),
                title: humanize_title(&name),
                relative_path: name,
                modified,
            });
        }
        Ok(entries)
    }

    fn render_real_file(
        &self,
        project: &Project,
        relative_path: &str,
        access: &AccessContext,
    ) -> Result<RenderedContent> {
        let path = self.resolver.resolve(project, relative_path, access)?;
        let bytes = fs::read(&path)?;
        let text = String::from_utf8_lossy(&bytes);

        let title = first_heading(&text).unwrap_or_else(|| {
            let file_name = Path::new(relative_path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            humanize_title(&file_name)
        });
        let html = self.renderer.render_markdown(&text);
        log::debug!(
            "ProjectFileManager: Rendered {path:?} ({} bytes of markdown).",
            bytes.len()
        );
        Ok(RenderedContent::new(title, html, ContentKind::Markdown))
    }
}

impl ProjectFileManagerOperations for CoreProjectFileManager {
    fn list_entries(&self, project_id: &str, access: &AccessContext) -> Result<Vec<FileEntry>> {
        let project = self.project(project_id)?;

        let mut entries: Vec<FileEntry> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for root_name in project.permitted_roots(access) {
            for entry in Self::scan_root(project, root_name)? {
                if let FileEntry::RealFile { relative_path, .. } = &entry {
                    // An earlier root wins resolution, so a later duplicate is unreachable.
                    if !seen.insert(relative_path.clone()) {
                        log::debug!(
                            "ProjectFileManager: {relative_path:?} in '{root_name}' is shadowed by an earlier root."
                        );
                        continue;
                    }
                }
                entries.push(entry);
            }
        }

        let real_count = entries.len();
        entries.extend(self.registry.list_virtual_pages(project, access));
        log::debug!(
            "ProjectFileManager: Listed {} files and {} virtual pages for '{project_id}' (authenticated: {}).",
            real_count,
            entries.len() - real_count,
            access.is_authenticated()
        );
        Ok(entries)
    }

    fn get_content(
        &self,
        project_id: &str,
        entry: &EntryRef,
        access: &AccessContext,
    ) -> Result<RenderedContent> {
        let project = self.project(project_id)?;
        match entry {
            EntryRef::File(relative_path) => self.render_real_file(project, relative_path, access),
            EntryRef::Virtual(page_id) => Ok(self.registry.render(project, page_id, access)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::UserId;
    use crate::core::test_support::{FITNESS_PROJECT, TestSite};

    fn alice() -> AccessContext {
        AccessContext::authenticated(UserId::new("alice"))
    }

    fn titles(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.title()).collect()
    }

    #[test]
    fn test_anonymous_listing_only_contains_public_files() {
        // Arrange
        let site = TestSite::new();

        // Act
        let entries = site
            .manager
            .list_entries(FITNESS_PROJECT, &AccessContext::anonymous())
            .unwrap();

        // Assert
        assert_eq!(titles(&entries), vec!["Fitness Plan", "Meal Plan", "Training Phases"]);
        assert!(entries.iter().all(|e| matches!(
            e,
            FileEntry::RealFile { root, .. } if root == "docs"
        )));
        assert!(entries.iter().all(|e| e.modified_display().is_some()));
    }

    #[test]
    fn test_authenticated_listing_appends_virtual_pages_in_order() {
        let site = TestSite::new();

        let entries = site.manager.list_entries(FITNESS_PROJECT, &alice()).unwrap();

        assert_eq!(
            titles(&entries),
            vec![
                "Fitness Plan",
                "Meal Plan",
                "Training Phases",
                "Body Composition",
                "Health Metrics Log",
                "Workout Log",
                "Meal Log",
                "Progress Photos",
                "Coaching Sessions",
            ]
        );
        let first_virtual = entries.iter().position(FileEntry::is_virtual).unwrap();
        assert!(entries[first_virtual..].iter().all(FileEntry::is_virtual));
        assert_eq!(entries[first_virtual..].len(), 5);
    }

    #[test]
    fn test_private_file_shadowed_by_public_file_is_listed_once() {
        let site = TestSite::new();

        let entries = site.manager.list_entries(FITNESS_PROJECT, &alice()).unwrap();

        let meal_plans: Vec<_> = entries
            .iter()
            .filter(|e| e.entry_ref() == EntryRef::File("meal_plan.md".into()))
            .collect();
        assert_eq!(meal_plans.len(), 1);
        assert!(matches!(meal_plans[0], FileEntry::RealFile { root, .. } if root == "docs"));
    }

    #[test]
    fn test_project_without_private_root_or_virtual_pages() {
        let site = TestSite::new();

        let entries = site.manager.list_entries("AI_Learning", &alice()).unwrap();

        assert_eq!(titles(&entries), vec!["Checklist"]);
    }

    #[test]
    fn test_unknown_project_is_not_found() {
        let site = TestSite::new();

        let listing = site.manager.list_entries("Nope", &alice());
        let content =
            site.manager
                .get_content("Nope", &EntryRef::File("fitness_plan.md".into()), &alice());

        assert!(matches!(listing, Err(ContentError::NotFound(_))));
        assert!(matches!(content, Err(ContentError::NotFound(_))));
    }

    #[test]
    fn test_real_file_renders_markdown_with_heading_title() {
        let site = TestSite::new();

        let content = site
            .manager
            .get_content(
                FITNESS_PROJECT,
                &EntryRef::File("fitness_plan.md".into()),
                &AccessContext::anonymous(),
            )
            .unwrap();

        assert_eq!(content.kind, ContentKind::Markdown);
        assert_eq!(content.title, "Twelve Week Plan");
        assert!(content.html.contains("<h1>Twelve Week Plan</h1>"));
        assert_eq!(content.html.matches("<tr>").count(), 3);
        assert_eq!(content.html.matches("<td>").count(), 4);
    }

    #[test]
    fn test_real_file_without_heading_uses_file_name() {
        let site = TestSite::new();

        let content = site
            .manager
            .get_content(
                FITNESS_PROJECT,
                &EntryRef::File("body_composition.md".into()),
                &alice(),
            )
            .unwrap();

        assert_eq!(content.title, "Body Composition");
    }

    #[test]
    fn test_private_file_is_not_found_for_anonymous() {
        let site = TestSite::new();
        let entry = EntryRef::File("body_composition.md".into());

        let anonymous = site
            .manager
            .get_content(FITNESS_PROJECT, &entry, &AccessContext::anonymous());
        let signed_in = site.manager.get_content(FITNESS_PROJECT, &entry, &alice());

        assert!(anonymous.unwrap_err().is_not_found());
        assert!(signed_in.is_ok());
    }

    #[test]
    fn test_traversal_is_reported_as_not_found() {
        let site = TestSite::new();

        let err = site
            .manager
            .get_content(
                FITNESS_PROJECT,
                &EntryRef::parse("../../etc/passwd"),
                &AccessContext::anonymous(),
            )
            .unwrap_err();

        assert!(matches!(err, ContentError::Boundary(_)));
        assert!(err.is_not_found());
        assert_eq!(err.user_message(), "Page not found.");
        assert_eq!(err.to_string(), "Entry not found: ../../etc/passwd");
    }

    #[test]
    fn test_virtual_page_for_anonymous_is_not_found() {
        let site = TestSite::new();

        let err = site
            .manager
            .get_content(
                FITNESS_PROJECT,
                &EntryRef::parse("virtual:health-metrics"),
                &AccessContext::anonymous(),
            )
            .unwrap_err();

        assert!(matches!(err, ContentError::NotFound(id) if id == "health-metrics"));
    }

    #[test]
    fn test_virtual_page_is_scoped_to_user() {
        let site = TestSite::new();
        let entry = EntryRef::Virtual("workout-log".into());

        let alice_page = site
            .manager
            .get_content(FITNESS_PROJECT, &entry, &alice())
            .unwrap();
        let bob_page = site
            .manager
            .get_content(
                FITNESS_PROJECT,
                &entry,
                &AccessContext::authenticated(UserId::new("bob")),
            )
            .unwrap();

        assert_eq!(alice_page.kind, ContentKind::Table);
        assert!(alice_page.html.contains("Deadlift"));
        assert!(!alice_page.html.contains("Swim"));
        assert!(bob_page.html.contains("Swim"));
        assert!(!bob_page.html.contains("Deadlift"));
        assert_ne!(alice_page.checksum, bob_page.checksum);
    }

    #[test]
    fn test_get_content_is_idempotent() {
        let site = TestSite::new();

        for entry in [
            EntryRef::File("meal_plan.md".into()),
            EntryRef::Virtual("health-metrics".into()),
        ] {
            let first = site.manager.get_content(FITNESS_PROJECT, &entry, &alice()).unwrap();
            let second = site.manager.get_content(FITNESS_PROJECT, &entry, &alice()).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_unavailable_store_fails_only_the_virtual_page() {
        // Arrange
        let site = TestSite::with_failing_store();

        // Act
        let entries = site.manager.list_entries(FITNESS_PROJECT, &alice()).unwrap();
        let page = site.manager.get_content(
            FITNESS_PROJECT,
            &EntryRef::Virtual("meal-log".into()),
            &alice(),
        );
        let file = site.manager.get_content(
            FITNESS_PROJECT,
            &EntryRef::File("meal_plan.md".into()),
            &alice(),
        );

        // Assert
        assert_eq!(entries.iter().filter(|e| e.is_virtual()).count(), 5);
        let err = page.unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(
            err.user_message(),
            "Meal Log is temporarily unavailable. Please try again later."
        );
        assert!(file.is_ok());
    }
}
