use super::checksum_utils;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/*
 * Plain data types shared by the resolver, the virtual page registry and the
 * file manager. None of these are persisted; listings and rendered content are
 * rebuilt on every request from the immutable project catalog.
 */

pub const PUBLIC_ROOT_NAME: &str = "docs";
pub const PRIVATE_ROOT_NAME: &str = "data";
pub const VIRTUAL_REF_PREFIX: &str = "virtual:";

/*
 * Opaque identity of an authenticated caller. Virtual page queries are always
 * parameterized by this value so one user never sees another user's records.
 */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/*
 * Per-request caller state supplied by the auth/session layer. An
 * authenticated context always carries an identity; there is no way to build
 * one without it.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    user: Option<UserId>,
}

impl AccessContext {
    pub fn anonymous() -> Self {
        AccessContext { user: None }
    }

    pub fn authenticated(user: UserId) -> Self {
        AccessContext { user: Some(user) }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref()
    }
}

/*
 * Immutable description of one content area. The project directory holds a
 * public root (always visible) and a private root (visible only to
 * authenticated callers).
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub directory: PathBuf,
    pub public_root: String,
    pub private_root: String,
}

impl Project {
    pub fn new(id: impl Into<String>, directory: PathBuf) -> Self {
        let id = id.into();
        Project {
            title: humanize_title(&id),
            description: String::new(),
            id,
            directory,
            public_root: PUBLIC_ROOT_NAME.to_string(),
            private_root: PRIVATE_ROOT_NAME.to_string(),
        }
    }

    /*
     * Root directory names the caller may read from, in resolution order.
     * The public root always comes first so a public file shadows a private
     * file with the same relative path.
     */
    pub fn permitted_roots(&self, access: &AccessContext) -> Vec<&str> {
        if access.is_authenticated() {
            vec![self.public_root.as_str(), self.private_root.as_str()]
        } else {
            vec![self.public_root.as_str()]
        }
    }

    pub fn root_dir(&self, root_name: &str) -> PathBuf {
        self.directory.join(root_name)
    }
}

/*
 * Reference to a single entry as it arrives from a request. The string form
 * uses a `virtual:` prefix for virtual pages; everything else is a path
 * relative to one of the project's roots.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryRef {
    File(String),
    Virtual(String),
}

impl EntryRef {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(VIRTUAL_REF_PREFIX) {
            Some(id) => EntryRef::Virtual(id.to_string()),
            None => EntryRef::File(raw.to_string()),
        }
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryRef::File(path) => write!(f, "{path}"),
            EntryRef::Virtual(id) => write!(f, "{VIRTUAL_REF_PREFIX}{id}"),
        }
    }
}

/*
 * One navigable unit in a project listing: either a markdown file on disk or
 * a virtual page whose content is generated from stored records.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum FileEntry {
    RealFile {
        root: String,
        relative_path: String,
        title: String,
        modified: Option<OffsetDateTime>,
    },
    VirtualPage {
        id: String,
        title: String,
    },
}

impl FileEntry {
    pub fn title(&self) -> &str {
        match self {
            FileEntry::RealFile { title, .. } => title,
            FileEntry::VirtualPage { title, .. } => title,
        }
    }

    pub fn entry_ref(&self) -> EntryRef {
        match self {
            FileEntry::RealFile { relative_path, .. } => EntryRef::File(relative_path.clone()),
            FileEntry::VirtualPage { id, .. } => EntryRef::Virtual(id.clone()),
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, FileEntry::VirtualPage { .. })
    }

    pub fn modified_display(&self) -> Option<String> {
        match self {
            FileEntry::RealFile {
                modified: Some(when),
                ..
            } => when.format(&Rfc3339).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Markdown,
    Table,
}

/*
 * Output of `get_content`: sanitized HTML plus the title of the entry it came
 * from. The checksum is the hex SHA-256 of `html` and is stable across
 * repeated renders of unchanged input.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedContent {
    pub title: String,
    pub html: String,
    pub kind: ContentKind,
    pub checksum: String,
}

impl RenderedContent {
    pub fn new(title: impl Into<String>, html: String, kind: ContentKind) -> Self {
        let checksum = checksum_utils::calculate_sha256_checksum(&html);
        RenderedContent {
            title: title.into(),
            html,
            kind,
            checksum,
        }
    }
}

/*
 * A single row returned by a data-store query. Fields are looked up by name;
 * column order is decided by whoever renders the record, never by the map.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<String>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn with_opt<T: ToString>(self, field: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.with(field, v.to_string()),
            None => self,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }
}

/*
 * Turns a file name into a display title: the extension is dropped,
 * separators become spaces and each word is capitalized.
 * `weekly_meal-plan.md` becomes `Weekly Meal Plan`.
 */
pub fn humanize_title(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    stem.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
