//! In-place rewriting of version fields inside a `.csproj` document.
//!
//! Only the text of the targeted elements changes; whitespace, comments and
//! every other element keep their original bytes. Markup inside `<!-- -->`
//! comments is never matched.

use crate::error::{ProjectError, Result};
use regex::Regex;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

static PROPERTY_GROUP_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<PropertyGroup(\s[^>]*)?>").expect("valid PropertyGroup pattern")
});

static CHILD_INDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([ \t]*)<").expect("valid indent pattern"));

// An unterminated comment runs to the end of the document
static XML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?(?:-->|\z)").expect("valid comment pattern"));

const PROPERTY_GROUP_CLOSE: &str = "</PropertyGroup>";

fn comment_spans(content: &str) -> Vec<Range<usize>> {
    XML_COMMENT.find_iter(content).map(|m| m.range()).collect()
}

fn in_comment(spans: &[Range<usize>], pos: usize) -> bool {
    spans.iter().any(|span| span.contains(&pos))
}

/// Values written into the property group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionFields {
    /// `Version`: the full package identity, pre-release label included
    pub version: String,
    /// `AssemblyVersion`: numeric only
    pub assembly_version: String,
    /// `FileVersion`: numeric only
    pub file_version: String,
}

impl VersionFields {
    fn entries(&self) -> [(&'static str, &'static Regex, &str); 3] {
        [
            ("Version", &*VERSION_ELEMENT, self.version.as_str()),
            (
                "AssemblyVersion",
                &*ASSEMBLY_VERSION_ELEMENT,
                self.assembly_version.as_str(),
            ),
            ("FileVersion", &*FILE_VERSION_ELEMENT, self.file_version.as_str()),
        ]
    }
}

/// Byte range of the unconditional property group body
struct GroupSpan {
    body_start: usize,
    body_end: usize,
}

fn find_property_group(content: &str) -> Option<GroupSpan> {
    let comments = comment_spans(content);
    for open in PROPERTY_GROUP_OPEN.captures_iter(content) {
        let whole = open.get(0)?;
        if in_comment(&comments, whole.start()) {
            continue;
        }
        let attrs = open.get(1).map(|m| m.as_str()).unwrap_or_default();
        if attrs.trim_end().ends_with('/') || attrs.contains("Condition") {
            continue;
        }
        let body_start = whole.end();
        let body_end = content[body_start..]
            .match_indices(PROPERTY_GROUP_CLOSE)
            .map(|(offset, _)| body_start + offset)
            .find(|pos| !in_comment(&comments, *pos))?;
        return Some(GroupSpan {
            body_start,
            body_end,
        });
    }
    None
}

/// Text range of the first uncommented element's value
fn element_value(body: &str, pattern: &Regex) -> Option<Range<usize>> {
    let comments = comment_spans(body);
    pattern
        .captures_iter(body)
        .filter(|caps| caps.get(0).is_some_and(|m| !in_comment(&comments, m.start())))
        .find_map(|caps| caps.get(2).map(|m| m.range()))
}

// Attributes are allowed, so `<Version>` never matches `<VersionPrefix>`
static VERSION_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<Version(?:\s[^>]*)?>)(.*?)(</Version>)").expect("valid Version pattern")
});

static ASSEMBLY_VERSION_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<AssemblyVersion(?:\s[^>]*)?>)(.*?)(</AssemblyVersion>)")
        .expect("valid AssemblyVersion pattern")
});

static FILE_VERSION_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)(<FileVersion(?:\s[^>]*)?>)(.*?)(</FileVersion>)")
        .expect("valid FileVersion pattern")
});

/// Rewrite `Version`, `AssemblyVersion` and `FileVersion` inside the first
/// `<PropertyGroup>` that has no `Condition`, creating missing elements.
pub fn apply_version_fields(content: &str, path: &Path, fields: &VersionFields) -> Result<String> {
    let span = find_property_group(content).ok_or_else(|| ProjectError::MissingPropertyGroup {
        path: path.to_path_buf(),
    })?;

    let mut body = content[span.body_start..span.body_end].to_string();
    let mut missing = Vec::new();

    for (name, pattern, value) in fields.entries() {
        match element_value(&body, pattern) {
            Some(range) => body.replace_range(range, value),
            None => missing.push(format!("<{name}>{value}</{name}>")),
        }
    }

    if !missing.is_empty() {
        body = insert_elements(&body, &missing, newline_for(content));
    }

    let mut out = String::with_capacity(content.len() + 128);
    out.push_str(&content[..span.body_start]);
    out.push_str(&body);
    out.push_str(&content[span.body_end..]);
    Ok(out)
}

fn newline_for(content: &str) -> &'static str {
    if content.contains("\r\n") { "\r\n" } else { "\n" }
}

/// Append elements at the end of a group body, matching its indentation
fn insert_elements(body: &str, elements: &[String], newline: &str) -> String {
    let kept = body.trim_end();
    let trailing = &body[kept.len()..];

    if !body.contains('\n') {
        return format!("{kept}{}{trailing}", elements.concat());
    }

    let closing_indent = trailing.rsplit('\n').next().unwrap_or_default();
    let child_indent = CHILD_INDENT
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| format!("{closing_indent}  "));

    let mut out = kept.to_string();
    for element in elements {
        out.push_str(newline);
        out.push_str(&child_indent);
        out.push_str(element);
    }
    out.push_str(newline);
    out.push_str(closing_indent);
    out
}
