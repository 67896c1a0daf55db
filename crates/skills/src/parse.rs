//! SKILL.md metadata extraction and frontmatter handling.
//!
//! The manifest may open with a `---`-delimited block of `key: value` lines.
//! Parsing is deliberately forgiving: malformed input degrades to partial or
//! empty metadata, it never errors.

/// Name/description pair extracted from a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Extract metadata from frontmatter, falling back per-field to markdown
/// heuristics (first `# ` heading, first paragraph line after it).
pub fn parse_metadata(markdown: &str) -> SkillMetadata {
    let mut name = None;
    let mut description = None;

    let mut lines = markdown.lines();
    if lines.next().map(str::trim) == Some("---") {
        for line in lines {
            if line.trim() == "---" {
                break;
            }
            if let Some((key, value)) = parse_frontmatter_line(line) {
                match key {
                    "name" if name.is_none() => name = Some(value),
                    "description" if description.is_none() => description = Some(value),
                    _ => {},
                }
            }
        }
    }

    if name.is_none() || description.is_none() {
        let fallback = parse_markdown_fallback(strip_frontmatter(markdown));
        name = name.or(fallback.name);
        description = description.or(fallback.description);
    }

    SkillMetadata { name, description }
}

/// Return the manifest body with the frontmatter block removed.
///
/// Input without a frontmatter block, or with an unterminated one, is
/// returned unchanged. The body is trimmed of surrounding newlines.
pub fn strip_frontmatter(markdown: &str) -> &str {
    let mut segments = markdown.split_inclusive('\n');
    let Some(first) = segments.next() else {
        return markdown;
    };
    if first.trim() != "---" {
        return markdown;
    }

    let mut offset = first.len();
    for segment in segments {
        let closes = segment.trim() == "---";
        offset += segment.len();
        if closes {
            return markdown[offset..].trim_matches(['\n', '\r']);
        }
    }

    markdown
}

/// Human-format a slug or file stem: dashes and underscores become spaces,
/// each word is capitalized.
pub fn format_title(raw: &str) -> String {
    raw.replace(['-', '_'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Split one `key: value` line at the first colon. The value is trimmed of
/// whitespace and a single pair of matching surrounding quotes.
fn parse_frontmatter_line(line: &str) -> Option<(&str, String)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Heuristic fallback over the manifest body: the first `# ` heading becomes
/// the name, the first non-empty non-heading line after that the description.
fn parse_markdown_fallback(body: &str) -> SkillMetadata {
    let mut name = None;
    let mut description = None;

    for line in body.lines() {
        let line = line.trim();
        if name.is_none() && line.starts_with("# ") {
            name = Some(line[2..].trim().to_string());
        } else if description.is_none() && !line.is_empty() && !line.starts_with('#') {
            description = Some(line.to_string());
            break;
        }
    }

    SkillMetadata { name, description }
}
