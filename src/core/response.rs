/*
 * Maps file manager results onto the status, body and cache validator the web
 * layer sends back. Error bodies come from `ContentError::user_message`, so no
 * path or store detail ever reaches a visitor.
 */
use super::file_manager::{self, ContentError};
use super::models::{FileEntry, RenderedContent};
use super::renderer::escape_html;

pub const STATUS_OK: u16 = 200;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_INTERNAL_ERROR: u16 = 500;
pub const STATUS_UNAVAILABLE: u16 = 503;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
    pub etag: Option<String>,
}

impl PageResponse {
    fn ok(body: String, etag: Option<String>) -> Self {
        PageResponse {
            status: STATUS_OK,
            body,
            etag,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

/*
 * Link target for one entry. Entry refs keep their string form
 * (`virtual:<id>` for virtual pages) so they round-trip through
 * `EntryRef::parse`.
 */
pub fn entry_href(project_id: &str, entry: &FileEntry) -> String {
    format!("/projects/{project_id}/{}", entry.entry_ref())
}

pub fn listing_response(
    project_id: &str,
    result: file_manager::Result<Vec<FileEntry>>,
) -> PageResponse {
    let entries = match result {
        Ok(entries) => entries,
        Err(err) => return error_response(&err),
    };

    let mut body = String::from("<nav class=\"project-entries\"><ul>");
    for entry in &entries {
        let class = if entry.is_virtual() {
            "entry virtual"
        } else {
            "entry"
        };
        body.push_str(&format!(
            "<li class=\"{class}\"><a href=\"{}\">{}</a>",
            escape_html(&entry_href(project_id, entry)),
            escape_html(entry.title())
        ));
        if let Some(modified) = entry.modified_display() {
            body.push_str(&format!(" <time datetime=\"{modified}\">{modified}</time>"));
        }
        body.push_str("</li>");
    }
    body.push_str("</ul></nav>");
    PageResponse::ok(body, None)
}

pub fn content_response(result: file_manager::Result<RenderedContent>) -> PageResponse {
    match result {
        Ok(content) => PageResponse::ok(
            format!("<article>{}</article>", content.html),
            Some(format!("\"{}\"", content.checksum)),
        ),
        Err(err) => error_response(&err),
    }
}

pub fn error_response(err: &ContentError) -> PageResponse {
    let status = match err {
        ContentError::Boundary(_) | ContentError::NotFound(_) => STATUS_NOT_FOUND,
        ContentError::DataUnavailable { .. } => STATUS_UNAVAILABLE,
        ContentError::Io(_) | ContentError::Scan(_) => STATUS_INTERNAL_ERROR,
    };
    if status == STATUS_INTERNAL_ERROR {
        log::error!("Response: Internal error while serving page: {err}");
    } else {
        log::debug!("Response: {status} for: {err}");
    }
    PageResponse {
        status,
        body: format!(
            "<p class=\"page-notice\">{}</p>",
            escape_html(&err.user_message())
        ),
        etag: None,
    }
}
