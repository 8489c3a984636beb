use crate::domain::model::Transform;
use crate::utils::error::{BundleError, Result};

// whitespace on both sides of these is insignificant
const TIGHT_PUNCTUATION: &[char] = &['{', '}', ';', ',', '>'];

impl Transform {
    pub fn apply(&self, path: &str, data: Vec<u8>) -> Result<Vec<u8>> {
        match self {
            Transform::Passthrough => Ok(data),
            Transform::CssMinify => {
                let source = String::from_utf8(data).map_err(|e| BundleError::TransformError {
                    path: path.to_string(),
                    message: format!("stylesheet is not valid UTF-8: {}", e),
                })?;
                Ok(minify_css(&source).into_bytes())
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transform::Passthrough => "passthrough",
            Transform::CssMinify => "css-minify",
        }
    }
}

/// Strips comments and insignificant whitespace. String literals and
/// `url(...)` bodies are copied verbatim.
pub fn minify_css(source: &str) -> String {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut pending_space = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i = match find_comment_end(&chars, i + 2) {
                Some(end) => end,
                None => chars.len(),
            };
            pending_space = true;
            continue;
        }

        if c.is_whitespace() {
            pending_space = true;
            i += 1;
            continue;
        }

        if TIGHT_PUNCTUATION.contains(&c) {
            if c == '}' && out.ends_with(';') {
                out.pop();
            }
            out.push(c);
            pending_space = false;
            i += 1;
            continue;
        }

        if pending_space && needs_space_after(&out) {
            out.push(' ');
        }
        pending_space = false;

        if c == '"' || c == '\'' {
            i = copy_string(&chars, i, &mut out);
            continue;
        }

        if starts_with_url(&chars, i) {
            i = copy_url(&chars, i, &mut out);
            continue;
        }

        out.push(c);
        i += 1;
    }

    out.trim_end().to_string()
}

fn needs_space_after(out: &str) -> bool {
    match out.chars().last() {
        None => false,
        Some(last) => !TIGHT_PUNCTUATION.contains(&last) && last != ':',
    }
}

fn find_comment_end(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1))
        .find(|&j| chars[j] == '*' && chars[j + 1] == '/')
        .map(|j| j + 2)
}

fn copy_string(chars: &[char], start: usize, out: &mut String) -> usize {
    let quote = chars[start];
    out.push(quote);
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        if c == '\\' && i + 1 < chars.len() {
            out.push(chars[i + 1]);
            i += 2;
            continue;
        }
        i += 1;
        if c == quote {
            break;
        }
    }
    i
}

fn starts_with_url(chars: &[char], i: usize) -> bool {
    if i + 4 > chars.len() {
        return false;
    }
    let head: String = chars[i..i + 4].iter().collect();
    let preceded_by_ident = i > 0 && (chars[i - 1].is_alphanumeric() || chars[i - 1] == '-');
    head.eq_ignore_ascii_case("url(") && !preceded_by_ident
}

fn copy_url(chars: &[char], start: usize, out: &mut String) -> usize {
    let mut i = start;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            i = copy_string(chars, i, out);
            continue;
        }
        out.push(c);
        i += 1;
        if c == ')' {
            break;
        }
    }
    i
}
