//! HTML table rendering
//!
//! Fills the bundled `ui/export.html` page with one table row per export
//! row. Rows with media get a download link and an inline preview pointing
//! at the relative `/videos/{filename}` URL.

use std::fmt::Write;

use crate::projector::ExportRow;

const EXPORT_HTML: &str = include_str!("../ui/export.html");

/// Render the export page
pub fn render_export_page(rows: &[ExportRow]) -> String {
    let mut body = String::new();
    for row in rows {
        render_row(&mut body, row);
    }

    EXPORT_HTML
        .replace("{{ROW_COUNT}}", &rows.len().to_string())
        .replace("{{ROWS}}", &body)
}

fn render_row(out: &mut String, row: &ExportRow) {
    let id = row.id.as_ref().map(|v| v.to_string()).unwrap_or_default();

    // Writing to a String cannot fail
    let _ = write!(
        out,
        "            <tr><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{:.4}</td><td class=\"num\">{:.4}</td>",
        escape_html(&id),
        escape_html(row.timestamp.as_deref().unwrap_or("")),
        escape_html(row.mood.as_deref().unwrap_or("")),
        row.lat,
        row.lng,
    );

    match (row.filename.as_deref(), row.file_url.as_deref()) {
        (Some(filename), Some(url)) => {
            let url = escape_html(url);
            let _ = write!(
                out,
                "<td><a href=\"{url}\" download>{}</a></td><td><video src=\"{url}\" controls preload=\"none\"></video></td>",
                escape_html(filename),
                url = url,
            );
        }
        _ => out.push_str("<td class=\"empty\">-</td><td class=\"empty\">-</td>"),
    }

    out.push_str("</tr>\n");
}

/// Escape text for use in HTML element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
