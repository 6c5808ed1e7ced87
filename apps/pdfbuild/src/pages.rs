//! Static HTML for the browser-facing routes

use pdfbuild_jobs::JobId;

pub(crate) const UPLOAD_FORM: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Build PDF from ZIP</title></head>
<body>
<h1>Upload ZIP (must contain a directory with a Makefile)</h1>
<form method="post" enctype="multipart/form-data" action="/build">
  <input type="file" name="file" accept=".zip" required>
  <input type="submit" value="Build PDF">
</form>
</body>
</html>
"#;

pub(crate) fn job_ready(id: &JobId, file_name: &str) -> String {
    let file_name = escape_html(file_name);
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Build finished</title></head>
<body>
<h1>Build finished</h1>
<p><a href="/jobs/{id}/download">Download {file_name}</a></p>
<p>The file is kept for a limited time. <a href="/">Build another archive</a></p>
</body>
</html>
"#
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
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
