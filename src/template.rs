//! Fixed HTML document skeleton wrapped around a rendered body fragment.

pub const DEFAULT_LOGO_URL: &str =
    "https://tkhqppfqsitovjvsstfl.supabase.co/storage/v1/object/public/assets/netskillLogo.png";

const DOCUMENT_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>PDF Template</title>
    <style>
        @page {
            size: A4;
            margin-top: 10mm;
            margin-bottom: 20mm;
            margin-left: 10mm;
            margin-right: 10mm;
        }
        body {
            font-family: Arial, sans-serif;
            font-size: 12px;
            margin: 0;
            padding: 20px;
        }
        .header {
            text-align: center;
            padding: 10px 0;
            border-bottom: 1px solid #000;
        }
        .header img {
            max-width: 150px;
        }
        .content {
            margin-top: 20px;
            font-size: 12px;
        }
    </style>
</head>
"#;

/// Builds complete HTML documents for the browser renderer.
#[derive(Debug, Clone)]
pub struct DocumentTemplate {
    default_logo_url: String,
}

impl DocumentTemplate {
    pub fn new(default_logo_url: impl Into<String>) -> Self {
        Self {
            default_logo_url: default_logo_url.into(),
        }
    }

    /// Wraps `body_html` in the page skeleton.
    ///
    /// The body is inserted verbatim. Only the logo URL is escaped since it lands
    /// inside an attribute.
    pub fn render(&self, body_html: &str, logo_url: Option<&str>) -> String {
        let logo = logo_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(&self.default_logo_url);

        let mut document = String::with_capacity(DOCUMENT_HEAD.len() + body_html.len() + 256);
        document.push_str(DOCUMENT_HEAD);
        document.push_str("<body>\n    <div class=\"header\">\n");
        document.push_str("        <img src=\"");
        document.push_str(&escape_attribute(logo));
        document.push_str("\" alt=\"Company Logo\">\n    </div>\n");
        document.push_str("    <div class=\"content\">\n");
        document.push_str(body_html);
        document.push_str("\n    </div>\n</body>\n</html>\n");
        document
    }
}

impl Default for DocumentTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_LOGO_URL)
    }
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
