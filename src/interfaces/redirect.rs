use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use url::Url;

/// Renders an HTML page that POSTs `fields` to `action` as soon as it loads.
pub fn auto_submit_document(action: &Url, fields: &[(&str, String)]) -> String {
    let inputs: String = fields
        .iter()
        .map(|(name, value)| {
            format!(
                "<input type=\"hidden\" name=\"{}\" value=\"{}\"/>",
                escape(name),
                escape(value)
            )
        })
        .collect();

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"/>\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"/></head>\
         <body onload=\"document.forms[0].submit()\">\
         <form method=\"POST\" action=\"{}\">{}\
         <noscript><button type=\"submit\">Continue</button></noscript>\
         </form></body></html>",
        escape(action.as_str()),
        inputs
    )
}

/// Wraps a document in a `data:` URL a browser session can open directly.
pub fn data_url(document: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "data:text/html;base64,{}",
        STANDARD.encode(document.as_bytes())
    ))
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
