/*
 * Shared on-disk fixture for tests that exercise the file manager end to end.
 * Each `TestSite` owns its own temporary content root, so tests never touch
 * each other's files.
 */
use super::config::SiteCatalog;
use super::file_manager::CoreProjectFileManager;
use super::health_store::{
    self, DataStoreError, HealthMetric, HealthStoreOperations, InMemoryHealthStore,
    UserHealthRecords, WorkoutEntry,
};
use super::models::{Project, UserId};
use super::path_resolver::CorePathResolver;
use super::renderer::{ContentRendererOperations, CoreContentRenderer};
use super::virtual_pages::VirtualPageRegistry;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

pub const FITNESS_PROJECT: &str = "Health_and_Fitness";
pub const LEARNING_PROJECT: &str = "AI_Learning";

pub const FITNESS_PLAN_MD: &str = "# Twelve Week Plan\n\n\
| Week | Focus |\n\
|------|-------|\n\
| 1 | Base |\n\
| 2 | Build |\n";

pub struct FailingHealthStore;

impl HealthStoreOperations for FailingHealthStore {
    fn user_records(&self, _user: &UserId) -> health_store::Result<UserHealthRecords> {
        Err(DataStoreError::Unavailable("connection refused".to_string()))
    }
}

pub struct TestSite {
    pub dir: TempDir,
    pub manager: CoreProjectFileManager,
}

impl TestSite {
    pub fn new() -> Self {
        Self::build(Arc::new(sample_store()))
    }

    pub fn with_failing_store() -> Self {
        Self::build(Arc::new(FailingHealthStore))
    }

    fn build(store: Arc<dyn HealthStoreOperations>) -> Self {
        let dir = tempdir().expect("Failed to create temp dir");
        write_content(dir.path());

        let fitness = Project::new(FITNESS_PROJECT, dir.path().join(FITNESS_PROJECT));
        let learning = Project::new(LEARNING_PROJECT, dir.path().join(LEARNING_PROJECT));
        let catalog = SiteCatalog::new(vec![fitness, learning]).expect("Fixture catalog is valid");

        let renderer: Arc<dyn ContentRendererOperations> = Arc::new(CoreContentRenderer::new());
        let mut registry = VirtualPageRegistry::new(Arc::clone(&renderer));
        registry
            .register_fitness_pages(FITNESS_PROJECT, store)
            .expect("Fitness pages register once");

        let manager = CoreProjectFileManager::new(
            Arc::new(catalog),
            Arc::new(CorePathResolver::new()),
            Arc::new(registry),
            renderer,
        );
        TestSite { dir, manager }
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture dir");
    }
    fs::write(path, content).expect("Failed to write fixture file");
}

/*
 * Layout:
 *   Health_and_Fitness/docs: fitness_plan.md, meal_plan.md, training_phases.md,
 *     plus a hidden draft, a non-markdown file and a nested directory
 *   Health_and_Fitness/data: body_composition.md, meal_plan.md (shadowed)
 *   AI_Learning/docs: checklist.md (no data root)
 */
fn write_content(root: &Path) {
    let fitness = root.join(FITNESS_PROJECT);
    write_file(&fitness.join("docs/fitness_plan.md"), FITNESS_PLAN_MD);
    write_file(
        &fitness.join("docs/meal_plan.md"),
        "# Public Meal Plan\n\nHigh protein, mostly plants.\n",
    );
    write_file(
        &fitness.join("docs/training_phases.md"),
        "# Phases\n\n1. Base\n2. Build\n3. Peak\n",
    );
    write_file(&fitness.join("docs/.draft.md"), "# Draft\n");
    write_file(&fitness.join("docs/notes.txt"), "not markdown");
    write_file(&fitness.join("docs/archive/old_plan.md"), "# Old\n");
    write_file(
        &fitness.join("data/body_composition.md"),
        "Measured monthly.\n\n- Weight\n- Body fat\n",
    );
    write_file(
        &fitness.join("data/meal_plan.md"),
        "# Private Meal Plan\n\nExact macros.\n",
    );

    write_file(
        &root.join(LEARNING_PROJECT).join("docs/checklist.md"),
        "- [x] Linear algebra\n- [ ] Transformers\n",
    );
}

pub fn sample_store() -> InMemoryHealthStore {
    let mut store = InMemoryHealthStore::new();
    store.insert(
        UserId::new("alice"),
        UserHealthRecords {
            health_metrics: vec![HealthMetric {
                date: "2025-03-01".to_string(),
                weight_kg: Some(64.2),
                body_fat_pct: Some(21.5),
                notes: String::new(),
            }],
            workouts: vec![WorkoutEntry {
                date: "2025-03-02".to_string(),
                workout_type: "Strength".to_string(),
                duration_min: Some(45),
                exercises: vec!["Deadlift".to_string(), "Row".to_string()],
                notes: String::new(),
            }],
            ..Default::default()
        },
    );
    store.insert(
        UserId::new("bob"),
        UserHealthRecords {
            workouts: vec![WorkoutEntry {
                date: "2025-03-04".to_string(),
                workout_type: "Cardio".to_string(),
                duration_min: Some(30),
                exercises: vec!["Swim".to_string()],
                notes: String::new(),
            }],
            ..Default::default()
        },
    );
    store
}
