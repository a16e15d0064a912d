/*
 * Converts content into the HTML fragments served to the browser: markdown
 * files through pulldown-cmark (sanitized with ammonia), and virtual page
 * records into a plain HTML table whose columns follow the page's declared
 * order.
 */
use super::models::Record;
use pulldown_cmark::{Options, Parser, html};

pub const EMPTY_TABLE_PLACEHOLDER: &str = r#"<p class="empty-state">No data yet.</p>"#;

/*
 * One declared table column: the record field it reads and the header text
 * shown to the user.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub field: &'static str,
    pub header: &'static str,
}

impl Column {
    pub const fn new(field: &'static str, header: &'static str) -> Self {
        Column { field, header }
    }
}

pub trait ContentRendererOperations: Send + Sync {
    /*
     * Renders markdown to sanitized HTML. Never fails; malformed constructs
     * (unclosed emphasis, broken tables) come out as literal text.
     */
    fn render_markdown(&self, text: &str) -> String;

    /*
     * Renders `rows` as an HTML table using `columns` for both header order and
     * cell lookup. An empty `rows` yields a "no data" placeholder instead of an
     * empty table.
     */
    fn render_table(&self, columns: &[Column], rows: &[Record]) -> String;
}

pub struct CoreContentRenderer {}

impl CoreContentRenderer {
    pub fn new() -> Self {
        CoreContentRenderer {}
    }
}

impl Default for CoreContentRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentRendererOperations for CoreContentRenderer {
    fn render_markdown(&self, text: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_TASKLISTS);

        let parser = Parser::new_ext(text, options);
        let mut html_output = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut html_output, parser);

        // Task-list checkboxes and footnote anchors must survive sanitizing.
        let mut sanitizer = ammonia::Builder::default();
        sanitizer
            .add_tags(&["input"])
            .add_tag_attributes("input", &["type", "checked", "disabled"])
            .add_tag_attributes("div", &["id"])
            .add_allowed_classes("div", &["footnote-definition"])
            .add_allowed_classes("sup", &["footnote-reference", "footnote-definition-label"]);
        sanitizer.clean(&html_output).to_string()
    }

    fn render_table(&self, columns: &[Column], rows: &[Record]) -> String {
        if rows.is_empty() {
            return EMPTY_TABLE_PLACEHOLDER.to_string();
        }

        let mut out = String::from("<table class=\"data-table\">\n<thead>\n<tr>");
        for column in columns {
            out.push_str("<th>");
            out.push_str(&escape_html(column.header));
            out.push_str("</th>");
        }
        out.push_str("</tr>\n</thead>\n<tbody>\n");

        for row in rows {
            out.push_str("<tr>");
            for column in columns {
                out.push_str("<td>");
                out.push_str(&escape_html(row.get(column.field).unwrap_or("")));
                out.push_str("</td>");
            }
            out.push_str("</tr>\n");
        }
        out.push_str("</tbody>\n</table>\n");
        out
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/*
 * Returns the text of the first level-one heading, if the document has one.
 * Used as the page title for real files.
 */
pub fn first_heading(text: &str) -> Option<String> {
    use pulldown_cmark::{Event, HeadingLevel, Tag, TagEnd};

    let mut in_heading = false;
    let mut title = String::new();
    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H1,
                ..
            }) => in_heading = true,
            Event::End(TagEnd::Heading(HeadingLevel::H1)) => {
                let trimmed = title.trim();
                return (!trimmed.is_empty()).then(|| trimmed.to_string());
            }
            Event::Text(t) | Event::Code(t) if in_heading => title.push_str(&t),
            _ => {}
        }
    }
    None
}
