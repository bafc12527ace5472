use std::fmt::Write;

use tariff_domain::MonthlyTable;

const STYLE: &str = "body{font-family:sans-serif;margin:2em}table{border-collapse:collapse}\
td,th{border:1px solid #ccc;padding:4px 8px;text-align:right}.error{color:#b00}";

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
         <title>{}</title><style>{STYLE}</style></head>\n<body>\n{body}</body></html>\n",
        escape(title)
    )
}

fn upload_form(layouts: &[&str], selected: &str) -> String {
    let mut options = String::new();
    for name in layouts {
        let sel = if *name == selected { " selected" } else { "" };
        let name = escape(name);
        let _ = write!(options, "<option value=\"{name}\"{sel}>{name}</option>");
    }
    format!(
        "<form method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\" accept=\".csv,text/csv\" required>\n\
         <select name=\"layout\">{options}</select>\n\
         <input type=\"submit\" value=\"Upload\">\n</form>\n"
    )
}

pub fn index(layouts: &[&str], selected: &str) -> String {
    page(
        "Electricity price comparison",
        &format!("<h1>Electricity price comparison</h1>\n{}", upload_form(layouts, selected)),
    )
}

pub struct ResultPage<'a> {
    pub title: &'a str,
    pub table: &'a MonthlyTable,
    pub skipped_rows: usize,
    pub image_src: &'a str,
    pub layouts: &'a [&'a str],
    pub layout: &'a str,
}

pub fn result(p: &ResultPage<'_>) -> String {
    let mut body = format!("<h1>{}</h1>\n", escape(p.title));
    body.push_str(&upload_form(p.layouts, p.layout));
    let _ = writeln!(body, "<img src=\"{}\" alt=\"{}\">", escape(p.image_src), escape(p.title));

    body.push_str("<table>\n<tr><th>Month</th>");
    for column in p.table.columns() {
        let _ = write!(body, "<th>{}</th>", escape(column.label()));
    }
    body.push_str("</tr>\n");
    for month in p.table.months() {
        let _ = write!(body, "<tr><td>{}</td>", month.month);
        for column in p.table.columns() {
            let value = month.total(*column).unwrap_or_default();
            let _ = write!(body, "<td>{value:.2}</td>");
        }
        body.push_str("</tr>\n");
    }
    body.push_str("</table>\n");

    if p.skipped_rows > 0 {
        let _ = writeln!(
            body,
            "<p>{} row(s) could not be read and were skipped.</p>",
            p.skipped_rows
        );
    }

    page(p.title, &body)
}

pub fn error(message: &str, layouts: &[&str], selected: &str) -> String {
    page(
        "Upload failed",
        &format!(
            "<h1>Upload failed</h1>\n<p class=\"error\">{}</p>\n{}",
            escape(message),
            upload_form(layouts, selected)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_replaces_markup() {
        assert_eq!(
            escape("<b>\"x\" & 'y'</b>"),
            "&lt;b&gt;&quot;x&quot; &amp; &#39;y&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn index_marks_selected_layout() {
        let html = index(&["named", "named_time"], "named_time");
        assert!(html.contains("<option value=\"named_time\" selected>"));
        assert!(html.contains("enctype=\"multipart/form-data\""));
    }

    #[test]
    fn error_page_escapes_message() {
        let html = error("missing required column '<kwh>'", &["named"], "named");
        assert!(html.contains("&lt;kwh&gt;"));
        assert!(!html.contains("<img"));
    }
}
