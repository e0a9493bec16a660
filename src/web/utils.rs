/// Page returned in place of a clone when any stage fails. The message is
/// HTML-escaped.
pub fn error_page(err: &str) -> String {
    let safe = html_escape::encode_text(err);
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><title>Error</title></head>
<body><h1>Error generating webpage</h1><pre style="white-space:pre-wrap">{safe}</pre></body></html>"#
    )
}
