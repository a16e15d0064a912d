/*
 * The virtual page registry: a fixed, explicitly constructed table of pages
 * that have no backing file and are rendered on demand from the caller's own
 * stored records. The registry is built once at startup and passed to the
 * file manager; tests build registries with fake fetch functions.
 *
 * Page existence is static. A page whose data source is failing is still
 * listed, and only the render of that page reports `DataUnavailable`.
 */
use super::health_store::{self, DataStoreError, HealthStoreOperations};
use super::models::{AccessContext, ContentKind, FileEntry, Project, Record, RenderedContent, UserId};
use super::renderer::{Column, ContentRendererOperations};
use std::sync::Arc;

pub const FITNESS_PAGE_SET: &str = "fitness";

pub type FetchFn = Arc<dyn Fn(&UserId) -> health_store::Result<Vec<Record>> + Send + Sync>;

#[derive(Debug)]
pub enum VirtualPageError {
    NotFound(String),
    DataUnavailable {
        page: String,
        source: DataStoreError,
    },
}

impl std::fmt::Display for VirtualPageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VirtualPageError::NotFound(id) => write!(f, "Virtual page not found: {id}"),
            VirtualPageError::DataUnavailable { page, source } => {
                write!(f, "Data for '{page}' is unavailable: {source}")
            }
        }
    }
}

impl std::error::Error for VirtualPageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VirtualPageError::DataUnavailable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/*
 * Raised while building the registry at startup; never seen by requests.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    DuplicatePage { project_id: String, page_id: String },
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::DuplicatePage {
                project_id,
                page_id,
            } => write!(
                f,
                "Virtual page '{page_id}' is already registered for project '{project_id}'"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

pub type Result<T> = std::result::Result<T, VirtualPageError>;

/*
 * Pure description of one virtual page: where it is listed, how its table is
 * laid out, and how to fetch the requesting user's rows.
 */
#[derive(Clone)]
pub struct VirtualPageDescriptor {
    pub id: String,
    pub title: String,
    pub project_id: String,
    pub columns: Vec<Column>,
    fetch: FetchFn,
}

impl VirtualPageDescriptor {
    pub fn new(
        project_id: impl Into<String>,
        id: impl Into<String>,
        title: impl Into<String>,
        columns: &[Column],
        fetch: impl Fn(&UserId) -> health_store::Result<Vec<Record>> + Send + Sync + 'static,
    ) -> Self {
        VirtualPageDescriptor {
            id: id.into(),
            title: title.into(),
            project_id: project_id.into(),
            columns: columns.to_vec(),
            fetch: Arc::new(fetch),
        }
    }

    pub fn fetch(&self, user: &UserId) -> health_store::Result<Vec<Record>> {
        (self.fetch)(user)
    }
}

impl std::fmt::Debug for VirtualPageDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualPageDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("project_id", &self.project_id)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

const HEALTH_METRIC_COLUMNS: [Column; 4] = [
    Column::new("date", "Date"),
    Column::new("weight_kg", "Weight (kg)"),
    Column::new("body_fat_pct", "Body Fat (%)"),
    Column::new("notes", "Notes"),
];

const WORKOUT_COLUMNS: [Column; 5] = [
    Column::new("date", "Date"),
    Column::new("workout_type", "Workout"),
    Column::new("duration_min", "Duration (min)"),
    Column::new("exercises", "Exercises"),
    Column::new("notes", "Notes"),
];

const MEAL_COLUMNS: [Column; 5] = [
    Column::new("date", "Date"),
    Column::new("meal_type", "Meal"),
    Column::new("description", "Description"),
    Column::new("calories", "Calories"),
    Column::new("protein_g", "Protein (g)"),
];

const PROGRESS_PHOTO_COLUMNS: [Column; 3] = [
    Column::new("date", "Date"),
    Column::new("caption", "Caption"),
    Column::new("image_path", "Photo"),
];

const COACHING_COLUMNS: [Column; 4] = [
    Column::new("date", "Date"),
    Column::new("coach", "Coach"),
    Column::new("topic", "Topic"),
    Column::new("summary", "Summary"),
];

pub struct VirtualPageRegistry {
    pages: Vec<VirtualPageDescriptor>,
    renderer: Arc<dyn ContentRendererOperations>,
}

impl VirtualPageRegistry {
    pub fn new(renderer: Arc<dyn ContentRendererOperations>) -> Self {
        VirtualPageRegistry {
            pages: Vec::new(),
            renderer,
        }
    }

    /*
     * Adds a page after all pages already registered. Registration order is
     * listing order, so related pages should be registered together.
     */
    pub fn register(
        &mut self,
        page: VirtualPageDescriptor,
    ) -> std::result::Result<(), RegistryError> {
        if self.find(&page.project_id, &page.id).is_some() {
            return Err(RegistryError::DuplicatePage {
                project_id: page.project_id,
                page_id: page.id,
            });
        }
        log::debug!(
            "VirtualPageRegistry: Registered '{}' for project '{}'.",
            page.id,
            page.project_id
        );
        self.pages.push(page);
        Ok(())
    }

    /*
     * Registers the five fitness tracking pages for `project_id`, in the order
     * they are shown: metrics, workouts, meals, photos, coaching.
     */
    pub fn register_fitness_pages(
        &mut self,
        project_id: &str,
        store: Arc<dyn HealthStoreOperations>,
    ) -> std::result::Result<(), RegistryError> {
        let s = Arc::clone(&store);
        self.register(VirtualPageDescriptor::new(
            project_id,
            "health-metrics",
            "Health Metrics Log",
            &HEALTH_METRIC_COLUMNS,
            move |user| Ok(s.user_records(user)?.health_metrics.iter().map(Record::from).collect()),
        ))?;

        let s = Arc::clone(&store);
        self.register(VirtualPageDescriptor::new(
            project_id,
            "workout-log",
            "Workout Log",
            &WORKOUT_COLUMNS,
            move |user| Ok(s.user_records(user)?.workouts.iter().map(Record::from).collect()),
        ))?;

        let s = Arc::clone(&store);
        self.register(VirtualPageDescriptor::new(
            project_id,
            "meal-log",
            "Meal Log",
            &MEAL_COLUMNS,
            move |user| Ok(s.user_records(user)?.meals.iter().map(Record::from).collect()),
        ))?;

        let s = Arc::clone(&store);
        self.register(VirtualPageDescriptor::new(
            project_id,
            "progress-photos",
            "Progress Photos",
            &PROGRESS_PHOTO_COLUMNS,
            move |user| {
                Ok(s.user_records(user)?
                    .progress_photos
                    .iter()
                    .map(Record::from)
                    .collect())
            },
        ))?;

        self.register(VirtualPageDescriptor::new(
            project_id,
            "coaching-sessions",
            "Coaching Sessions",
            &COACHING_COLUMNS,
            move |user| {
                Ok(store
                    .user_records(user)?
                    .coaching_sessions
                    .iter()
                    .map(Record::from)
                    .collect())
            },
        ))
    }

    fn find(&self, project_id: &str, page_id: &str) -> Option<&VirtualPageDescriptor> {
        self.pages
            .iter()
            .find(|p| p.project_id == project_id && p.id == page_id)
    }

    /*
     * Virtual pages visible to `access` in `project`, in registration order.
     * Anonymous callers get nothing since every page is identity-scoped.
     */
    pub fn list_virtual_pages(&self, project: &Project, access: &AccessContext) -> Vec<FileEntry> {
        if !access.is_authenticated() {
            return Vec::new();
        }
        self.pages
            .iter()
            .filter(|p| p.project_id == project.id)
            .map(|p| FileEntry::VirtualPage {
                id: p.id.clone(),
                title: p.title.clone(),
            })
            .collect()
    }

    /*
     * Fetches the caller's rows for `page_id` and renders them as a table.
     * Anonymous callers get `NotFound`, the same as for an unknown id, so the
     * existence of private pages is not revealed.
     */
    pub fn render(
        &self,
        project: &Project,
        page_id: &str,
        access: &AccessContext,
    ) -> Result<RenderedContent> {
        let Some(user) = access.user_id() else {
            log::debug!(
                "VirtualPageRegistry: Anonymous request for '{page_id}' in '{}' treated as not found.",
                project.id
            );
            return Err(VirtualPageError::NotFound(page_id.to_string()));
        };
        let page = self
            .find(&project.id, page_id)
            .ok_or_else(|| VirtualPageError::NotFound(page_id.to_string()))?;

        let rows = page.fetch(user).map_err(|source| {
            log::error!(
                "VirtualPageRegistry: Fetch for '{}' (project '{}') failed: {source}",
                page.id,
                project.id
            );
            VirtualPageError::DataUnavailable {
                page: page.title.clone(),
                source,
            }
        })?;
        log::debug!(
            "VirtualPageRegistry: Rendering {} rows for '{}'.",
            rows.len(),
            page.id
        );

        let html = self.renderer.render_table(&page.columns, &rows);
        Ok(RenderedContent::new(page.title.clone(), html, ContentKind::Table))
    }
}
