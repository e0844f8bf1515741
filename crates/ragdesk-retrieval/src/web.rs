//! Fetches web pages for ingestion and reduces HTML to readable text.

use crate::error::{Result, RetrievalError};
use crate::loader::{extension_of, parse_document_blocking, ParsedDocument};

/// A fetched page, parsed, with the raw body kept for blob storage
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    /// Safe on-disk name derived from the URL, extension included
    pub blob_name: String,
    pub parsed: ParsedDocument,
    pub body: Vec<u8>,
}

pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<FetchedPage> {
    let fetch_error = |reason: String| RetrievalError::Fetch {
        url: url.to_string(),
        reason,
    };

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("HTTP {}", status)));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_lowercase();
    let body = response
        .bytes()
        .await
        .map_err(|e| fetch_error(e.to_string()))?
        .to_vec();

    let extension = extension_for(&content_type, url);
    let blob_name = format!("{}.{}", slug(url), extension);
    let parsed = parse_document_blocking(&blob_name, &body).await?;

    tracing::debug!(url, content_type = %content_type, bytes = body.len(), "Fetched page");
    Ok(FetchedPage {
        url: url.to_string(),
        blob_name,
        parsed,
        body,
    })
}

/// Picks a loader from the response type, then the URL path; pages default to HTML
fn extension_for(content_type: &str, url: &str) -> &'static str {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    match mime {
        "text/html" | "application/xhtml+xml" => return "html",
        "application/pdf" => return "pdf",
        "text/markdown" => return "md",
        "text/plain" => return "txt",
        _ => {}
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    match extension_of(path).as_str() {
        "pdf" => "pdf",
        "md" | "markdown" => "md",
        "txt" => "txt",
        _ => "html",
    }
}

fn slug(url: &str) -> String {
    let trimmed = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .trim_end_matches('/');

    let mut slug = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            slug.push(c);
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }

    let slug: String = slug.trim_matches('_').chars().take(80).collect();
    if slug.is_empty() {
        "page".to_string()
    } else {
        slug
    }
}

/// Visible text of an HTML document. Script, style and head content is dropped.
pub fn html_to_text(html: &str) -> String {
    const SKIPPED: &[&str] = &["script", "style", "head", "noscript", "template", "svg"];
    const BLOCKS: &[&str] = &[
        "p", "div", "br", "li", "ul", "ol", "tr", "table", "section", "article", "header",
        "footer", "nav", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "title",
    ];

    let mut out = String::with_capacity(html.len() / 2);
    let mut rest = html;
    let mut skipping: Option<String> = None;

    while let Some(open) = rest.find('<') {
        if skipping.is_none() {
            out.push_str(&decode_entities(&rest[..open]));
        }
        rest = &rest[open..];

        if rest.starts_with("<!--") {
            rest = rest.find("-->").map_or("", |end| &rest[end + 3..]);
            continue;
        }

        let Some(close) = rest.find('>') else {
            rest = "";
            break;
        };
        let tag = &rest[1..close];
        rest = &rest[close + 1..];

        let closing = tag.starts_with('/');
        let name: String = tag
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        if let Some(skipped) = skipping.as_deref() {
            if closing && skipped == name {
                skipping = None;
            }
            continue;
        }
        if !closing && SKIPPED.contains(&name.as_str()) && !tag.ends_with('/') {
            skipping = Some(name);
            continue;
        }

        if BLOCKS.contains(&name.as_str()) {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    if skipping.is_none() {
        out.push_str(&decode_entities(rest));
    }

    collapse_whitespace(&out)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Keeps line breaks between blocks, one space between words
fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
