//! Provenance annotation rendering for locked output.
//!
//! Each pin in a lock file carries a `# via` comment naming the requirements
//! that pulled it in. Resolvers render those names from host paths, so a lock
//! produced on Windows would otherwise differ from one produced elsewhere.
//! The formatter here is injected into the invoker, and the same formatter is
//! used to re-render annotations already written by an external resolver.
use regex::Regex;
use std::sync::OnceLock;

const VIA: &str = "# via";
const CONTINUATION_INDENT: &str = "    #   ";

/// The two annotation layouts a resolver can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationStyle {
    /// `# via a, b` on a single line.
    Line,
    /// `# via` followed by one `#   source` line per source.
    Split,
}

/// Strategy that turns a set of provenance sources into annotation text.
pub trait ProvenanceFormatter {
    fn format(&self, style: AnnotationStyle, required_by: &[String]) -> String;
}

/// Annotation layout matching pip-tools style resolvers.
///
/// Sources are rendered in the order given.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverLayout;

impl ProvenanceFormatter for ResolverLayout {
    fn format(&self, style: AnnotationStyle, required_by: &[String]) -> String {
        let sources: Vec<&str> = required_by.iter().map(String::as_str).collect();
        match style {
            AnnotationStyle::Line => format!("{VIA} {}", sources.join(", ")),
            AnnotationStyle::Split if sources.len() == 1 => format!("{VIA} {}", sources[0]),
            AnnotationStyle::Split => {
                let mut out = VIA.to_string();
                for source in sources {
                    out.push('\n');
                    out.push_str(CONTINUATION_INDENT);
                    out.push_str(source);
                }
                out
            }
        }
    }
}

/// Rewrites backslash separators in every source before delegating.
///
/// Positions are kept. Two sources collapse into the first only when the
/// rewrite is what made them equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardSlashes<F>(pub F);

impl<F: ProvenanceFormatter> ProvenanceFormatter for ForwardSlashes<F> {
    fn format(&self, style: AnnotationStyle, required_by: &[String]) -> String {
        let mut kept: Vec<(String, bool)> = Vec::with_capacity(required_by.len());
        for source in required_by {
            let normalized = normalize_separators(source);
            let rewritten = normalized != *source;
            let collapses = kept.iter().any(|(earlier, was_rewritten)| {
                *earlier == normalized && (rewritten || *was_rewritten)
            });
            if !collapses {
                kept.push((normalized, rewritten));
            }
        }
        let normalized: Vec<String> = kept.into_iter().map(|(source, _)| source).collect();
        self.0.format(style, &normalized)
    }
}

/// Formatter used for every run unless a caller injects another.
pub fn default_formatter() -> ForwardSlashes<ResolverLayout> {
    ForwardSlashes(ResolverLayout)
}

/// Replace every backslash path separator with a forward slash.
pub fn normalize_separators(text: &str) -> String {
    text.replace('\\', "/")
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<prefix>|.*?\s)# via(?P<rest>| .*)$").expect("valid annotation regex")
    })
}

fn continuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*#   (?P<source>\S.*)$").expect("valid continuation regex")
    })
}

/// A `# via` annotation located in rendered lock text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Index of the line holding `# via`.
    pub line: usize,
    /// Number of lines the annotation spans, header included.
    pub span: usize,
    pub style: AnnotationStyle,
    pub required_by: Vec<String>,
}

/// Find every provenance annotation in `text`.
pub fn find_annotations(text: &str) -> Vec<Annotation> {
    let lines: Vec<&str> = text.lines().collect();
    let mut found = Vec::new();
    let mut index = 0;
    while index < lines.len() {
        let Some(header) = header_re().captures(lines[index]) else {
            index += 1;
            continue;
        };
        let rest = header.name("rest").map_or("", |m| m.as_str()).trim();
        if !rest.is_empty() {
            found.push(Annotation {
                line: index,
                span: 1,
                style: AnnotationStyle::Line,
                required_by: rest.split(", ").map(str::to_string).collect(),
            });
            index += 1;
            continue;
        }
        let required_by: Vec<String> = lines[index + 1..]
            .iter()
            .map_while(|line| continuation_re().captures(line))
            .filter_map(|caps| caps.name("source").map(|m| m.as_str().to_string()))
            .collect();
        let span = required_by.len() + 1;
        // A bare `# via` with no sources is not an annotation we can re-render.
        if !required_by.is_empty() {
            found.push(Annotation {
                line: index,
                span,
                style: AnnotationStyle::Split,
                required_by,
            });
        }
        index += span;
    }
    found
}

/// Re-render every annotation in `text` through `formatter`.
///
/// Lines outside annotations, including their terminators, are left as is.
/// Applying this twice with a normalizing formatter yields the same text.
pub fn reformat(text: &str, formatter: &dyn ProvenanceFormatter) -> String {
    let annotations = find_annotations(text);
    if annotations.is_empty() {
        return text.to_string();
    }
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut out = String::with_capacity(text.len());
    let mut next = annotations.iter().peekable();
    let mut index = 0;
    while index < lines.len() {
        let raw = lines[index];
        let Some(annotation) = next.next_if(|a| a.line == index) else {
            out.push_str(raw);
            index += 1;
            continue;
        };
        let (body, eol) = split_terminator(raw);
        let prefix = header_re()
            .captures(body)
            .and_then(|caps| caps.name("prefix"))
            .map_or("", |m| m.as_str());
        let rendered = formatter.format(annotation.style, &annotation.required_by);
        out.push_str(prefix);
        let mut rendered_lines = rendered.split('\n').peekable();
        while let Some(line) = rendered_lines.next() {
            out.push_str(line);
            if rendered_lines.peek().is_some() {
                out.push_str(if eol.is_empty() { "\n" } else { eol });
            }
        }
        let last = lines[index + annotation.span - 1];
        out.push_str(split_terminator(last).1);
        index += annotation.span;
    }
    out
}

fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

#[cfg(test)]
#[path = "annotations_tests.rs"]
mod tests;
