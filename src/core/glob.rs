use crate::domain::ports::Storage;
use crate::utils::error::{BundleError, Result};
use regex::Regex;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// A compiled `/`-separated glob, relative to the project root.
///
/// The base is the wildcard-free leading directory; matched files are
/// re-rooted relative to it when copied. A pattern without wildcards is
/// singular and its base is the parent directory.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    base: String,
    literal_segments: Vec<String>,
    regex: Regex,
    singular: bool,
    dot: bool,
}

impl GlobPattern {
    pub fn new(pattern: &str, dot: bool) -> Result<Self> {
        let invalid = |reason: &str| BundleError::InvalidGlobError {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern.trim().is_empty() {
            return Err(invalid("pattern is empty"));
        }
        if pattern.starts_with('/') {
            return Err(invalid("pattern must be relative to the project root"));
        }

        let segments: Vec<&str> = pattern
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();

        if segments.is_empty() {
            return Err(invalid("pattern has no path segments"));
        }
        if segments.iter().any(|s| *s == "..") {
            return Err(invalid("pattern must not contain '..'"));
        }

        let (base, singular) = match segments.iter().position(|s| s.contains(GLOB_META)) {
            Some(idx) => (segments[..idx].join("/"), false),
            None => (segments[..segments.len() - 1].join("/"), true),
        };

        let base_len = if base.is_empty() { 0 } else { base.split('/').count() };
        let literal_segments = segments[base_len..]
            .iter()
            .filter(|s| !s.contains(GLOB_META))
            .map(|s| s.to_string())
            .collect();

        let source = format!("^{}$", translate_segments(&segments).map_err(|r| invalid(r.as_str()))?);
        let regex = Regex::new(&source).map_err(|e| invalid(e.to_string().as_str()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            base,
            literal_segments,
            regex,
            singular,
            dot,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn is_singular(&self) -> bool {
        self.singular
    }

    pub fn matches(&self, path: &str) -> bool {
        let path = path.strip_prefix("./").unwrap_or(path);
        if !self.regex.is_match(path) {
            return false;
        }
        self.dot || !self.is_hidden(path)
    }

    /// Path of `path` below the glob base, or `None` when it is not under it.
    pub fn relative_to_base<'a>(&self, path: &'a str) -> Option<&'a str> {
        let path = path.strip_prefix("./").unwrap_or(path);
        if self.base.is_empty() {
            return Some(path);
        }
        path.strip_prefix(self.base.as_str())?.strip_prefix('/')
    }

    pub async fn expand<S: Storage>(&self, storage: &S) -> Result<Vec<String>> {
        let candidates = storage.list_files(&self.base).await?;
        let mut matched: Vec<String> = candidates.into_iter().filter(|p| self.matches(p)).collect();
        matched.sort();

        tracing::debug!("{} matched {} files", self.pattern, matched.len());
        Ok(matched)
    }

    // Dotfiles below the base only match when the pattern names them literally.
    fn is_hidden(&self, path: &str) -> bool {
        self.relative_to_base(path)
            .map(|rel| {
                rel.split('/')
                    .any(|seg| seg.starts_with('.') && !self.literal_segments.iter().any(|l| l == seg))
            })
            .unwrap_or(false)
    }
}

fn translate_segments(segments: &[&str]) -> std::result::Result<String, String> {
    let mut out = String::new();
    let mut need_separator = false;

    for (idx, segment) in segments.iter().enumerate() {
        if need_separator {
            out.push('/');
        }

        if *segment == "**" {
            if idx + 1 == segments.len() {
                out.push_str(".*");
            } else {
                // swallows the separator of the next segment
                out.push_str("(?:[^/]+/)*");
            }
            need_separator = false;
        } else {
            out.push_str(&translate_segment(segment)?);
            need_separator = true;
        }
    }

    Ok(out)
}

fn translate_segment(segment: &str) -> std::result::Result<String, String> {
    let chars: Vec<char> = segment.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                out.push_str("[^/]*");
            }
            '?' => out.push_str("[^/]"),
            '[' => {
                let (class, next) = translate_class(&chars, i)?;
                out.push_str(&class);
                i = next;
                continue;
            }
            '{' => {
                let close = find_closing_brace(&chars, i)?;
                let inner: String = chars[i + 1..close].iter().collect();
                let alternatives = split_alternatives(&inner)
                    .iter()
                    .map(|alt| translate_segment(alt))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                out.push_str(&format!("(?:{})", alternatives.join("|")));
                i = close + 1;
                continue;
            }
            '}' => return Err("unbalanced '}'".to_string()),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                out.push_str(&regex::escape(&chars[i].to_string()));
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    Ok(out)
}

fn translate_class(chars: &[char], start: usize) -> std::result::Result<(String, usize), String> {
    let mut i = start + 1;
    let mut out = String::from("[");

    if i < chars.len() && (chars[i] == '!' || chars[i] == '^') {
        out.push('^');
        i += 1;
    }
    // a leading ']' is literal
    if i < chars.len() && chars[i] == ']' {
        out.push_str("\\]");
        i += 1;
    }

    while i < chars.len() {
        match chars[i] {
            ']' => {
                out.push(']');
                return Ok((out, i + 1));
            }
            '\\' | '[' | '&' | '~' => {
                out.push('\\');
                out.push(chars[i]);
            }
            c => out.push(c),
        }
        i += 1;
    }

    Err("unbalanced '['".to_string())
}

fn find_closing_brace(chars: &[char], start: usize) -> std::result::Result<usize, String> {
    let mut depth = 0;
    for (idx, c) in chars.iter().enumerate().skip(start) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(idx);
                }
            }
            _ => {}
        }
    }
    Err("unbalanced '{'".to_string())
}

fn split_alternatives(inner: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0;

    for c in inner.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}
