//! Text-level code analysis. Nothing here parses the language properly;
//! definitions are found line by line and blocks are delimited by braces
//! or indentation.

use std::sync::LazyLock;

use regex::Regex;

use super::language::{Language, NOT_FUNCTION_NAMES};

/// Lines longer than this are reported.
pub const MAX_LINE_LENGTH: usize = 120;

static BARE_EXCEPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*except\s*:").unwrap());
static PYTHON_DOCSTRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^[rRuUbB]*["']"#).unwrap());

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LineMetrics {
    pub total: usize,
    pub code: usize,
    pub comment: usize,
    pub blank: usize,
}

/// A function or method found in the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    /// 1-based line of the definition.
    pub line: usize,
    /// 1-based last line of the body.
    pub end_line: usize,
    pub documented: bool,
}

impl Definition {
    /// Lines spanned after the first one.
    #[inline]
    pub fn length(&self) -> usize {
        self.end_line - self.line
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Structure {
    pub functions: Vec<Definition>,
    pub types: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Major,
    Minor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issue {
    pub line: usize,
    pub severity: Severity,
    pub title: &'static str,
    pub description: String,
}

/// Per-line view of a source file.
pub struct Analysis<'a> {
    language: Language,
    lines: Vec<&'a str>,
    comments: Vec<bool>,
}

impl<'a> Analysis<'a> {
    pub fn new(text: &'a str, language: Language) -> Self {
        let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();
        let comments = comment_mask(&lines, language);
        Self {
            language,
            lines,
            comments,
        }
    }

    #[inline]
    fn is_code(&self, idx: usize) -> bool {
        !self.comments[idx] && !self.lines[idx].trim().is_empty()
    }

    pub fn line_metrics(&self) -> LineMetrics {
        let total = self.lines.len();
        let comment = self.comments.iter().filter(|c| **c).count();
        let code = (0..total).filter(|&i| self.is_code(i)).count();
        LineMetrics {
            total,
            code,
            comment,
            blank: total - code - comment,
        }
    }

    pub fn structure(&self) -> Structure {
        let Some(patterns) = self.language.patterns() else {
            return Structure::default();
        };
        let mut structure = Structure::default();
        for (idx, line) in self.lines.iter().enumerate() {
            if !self.is_code(idx) {
                continue;
            }
            if let Some(name) = first_capture(&patterns.types, line) {
                structure.types.push(name);
                continue;
            }
            let Some(name) = first_capture(&patterns.functions, line) else {
                continue;
            };
            if NOT_FUNCTION_NAMES.contains(&name.as_str()) {
                continue;
            }
            let end = if self.language.uses_braces() {
                self.brace_block_end(idx)
            } else {
                self.indented_block_end(idx)
            };
            structure.functions.push(Definition {
                name,
                line: idx + 1,
                end_line: end + 1,
                documented: self.is_documented(idx),
            });
        }
        structure
    }

    /// Counts branching and looping statements.
    pub fn control_flow_count(&self) -> usize {
        let Some(patterns) = self.language.patterns() else {
            return 0;
        };
        (0..self.lines.len())
            .filter(|&idx| self.is_code(idx))
            .map(|idx| {
                patterns
                    .control_flow
                    .find_iter(self.code_part(idx))
                    .count()
            })
            .sum()
    }

    pub fn detect_issues(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        for (idx, line) in self.lines.iter().enumerate() {
            let n = idx + 1;
            let len = line.chars().count();
            if len > MAX_LINE_LENGTH {
                issues.push(Issue {
                    line: n,
                    severity: Severity::Minor,
                    title: "Line too long",
                    description: format!(
                        "Line has {len} characters (recommended max: {MAX_LINE_LENGTH})"
                    ),
                });
            }
            if self.language == Language::Python && BARE_EXCEPT.is_match(line) {
                issues.push(Issue {
                    line: n,
                    severity: Severity::Major,
                    title: "Bare except clause",
                    description: "Use specific exception types instead of bare 'except:'"
                        .to_owned(),
                });
            }
            if line.contains("TODO") || line.contains("FIXME") {
                issues.push(Issue {
                    line: n,
                    severity: Severity::Minor,
                    title: "TODO/FIXME comment",
                    description: "Unresolved TODO or FIXME comment".to_owned(),
                });
            }
        }
        let (title, noun) = match self.language {
            Language::Python => ("Missing docstring", "docstring"),
            _ => ("Missing doc comment", "doc comment"),
        };
        for function in self.structure().functions {
            if !function.documented {
                issues.push(Issue {
                    line: function.line,
                    severity: Severity::Minor,
                    title,
                    description: format!("Function '{}' has no {noun}", function.name),
                });
            }
        }
        issues
    }

    /// The line without a trailing line comment.
    fn code_part(&self, idx: usize) -> &'a str {
        let line = self.lines[idx];
        match line.find(self.language.line_comment()) {
            Some(pos) => &line[..pos],
            None => line,
        }
    }

    fn indent(&self, idx: usize) -> usize {
        let line = self.lines[idx];
        line.len() - line.trim_start().len()
    }

    /// Index of the line holding the `:` that ends a Python signature.
    fn signature_end(&self, start: usize) -> usize {
        (start..self.lines.len())
            .find(|&idx| self.code_part(idx).trim_end().ends_with(':'))
            .unwrap_or(start)
    }

    /// Last non-blank line of an indentation-delimited block.
    fn indented_block_end(&self, start: usize) -> usize {
        let indent = self.indent(start);
        let mut end = self.signature_end(start);
        for idx in end + 1..self.lines.len() {
            if !self.is_code(idx) {
                continue;
            }
            if self.indent(idx) <= indent {
                break;
            }
            end = idx;
        }
        end
    }

    /// Line where the braces opened at or after `start` balance again. A
    /// definition ending in `;` before any brace has no body.
    fn brace_block_end(&self, start: usize) -> usize {
        let mut depth = 0usize;
        let mut opened = false;
        for idx in start..self.lines.len() {
            for ch in self.code_part(idx).chars() {
                match ch {
                    '{' => {
                        depth += 1;
                        opened = true;
                    }
                    '}' => depth = depth.saturating_sub(1),
                    ';' if !opened => return idx,
                    _ => {}
                }
                if opened && depth == 0 {
                    return idx;
                }
            }
        }
        self.lines.len().saturating_sub(1)
    }

    fn is_documented(&self, idx: usize) -> bool {
        match self.language {
            Language::Python => {
                let body = self.signature_end(idx) + 1;
                (body..self.lines.len())
                    .find(|&i| !self.lines[i].trim().is_empty())
                    .is_some_and(|i| PYTHON_DOCSTRING.is_match(self.lines[i].trim_start()))
            }
            Language::Other => true,
            _ => {
                let Some(prev) = (0..idx).rev().find(|&i| {
                    let line = self.lines[i].trim();
                    !(line.is_empty() || line.starts_with("#[") || line.starts_with('@'))
                }) else {
                    return false;
                };
                let line = self.lines[prev].trim();
                line.starts_with("///")
                    || line.starts_with("//!")
                    || line.ends_with("*/")
            }
        }
    }
}

fn first_capture(patterns: &[Regex], line: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Marks lines that hold only a comment.
fn comment_mask(lines: &[&str], language: Language) -> Vec<bool> {
    let line_comment = language.line_comment();
    let mut in_block = false;
    lines
        .iter()
        .map(|line| {
            let line = line.trim();
            if in_block {
                in_block = !line.contains("*/");
                return true;
            }
            if line.starts_with(line_comment) {
                return true;
            }
            if language.has_block_comments() && line.starts_with("/*") {
                in_block = !line[2..].contains("*/");
                return true;
            }
            false
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PYTHON: &str = r#"import os

# helpers
class Greeter:
    """Says hello."""

    def greet(self, name):
        """Greets someone."""
        if name:
            return f"Hello {name}"
        return "Hello"


def undocumented(items):
    total = 0
    for item in items:
        try:
            total += item
        except:
            pass
    return total
"#;

    const RUST: &str = r#"/// A point.
pub struct Point {
    x: i32,
}

/* block
   comment */
impl Point {
    /// Creates a point.
    pub fn new(x: i32) -> Self {
        Self { x }
    }

    #[inline]
    pub fn double(&self) -> i32 {
        if self.x > 0 { self.x * 2 } else { 0 } // TODO: overflow
    }
}

trait Shape {
    fn area(&self) -> f64;
}
"#;

    #[test]
    fn test_python_line_metrics() {
        let metrics = Analysis::new(PYTHON, Language::Python).line_metrics();
        assert_eq!(metrics.total, 22);
        assert_eq!(metrics.comment, 1);
        assert_eq!(metrics.blank, 5);
        assert_eq!(metrics.code, 16);
    }

    #[test]
    fn test_python_structure() {
        let analysis = Analysis::new(PYTHON, Language::Python);
        let structure = analysis.structure();
        assert_eq!(structure.types, ["Greeter"]);
        let names: Vec<_> =
            structure.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["greet", "undocumented"]);

        let greet = &structure.functions[0];
        assert_eq!((greet.line, greet.end_line), (7, 11));
        assert!(greet.documented);
        let undocumented = &structure.functions[1];
        assert_eq!((undocumented.line, undocumented.end_line), (14, 21));
        assert!(!undocumented.documented);

        // if, for, try
        assert_eq!(analysis.control_flow_count(), 3);
    }

    #[test]
    fn test_python_issues() {
        let issues = Analysis::new(PYTHON, Language::Python).detect_issues();
        let titles: Vec<_> = issues.iter().map(|i| (i.line, i.title)).collect();
        assert_eq!(
            titles,
            [(19, "Bare except clause"), (14, "Missing docstring")]
        );
        assert_eq!(issues[0].severity, Severity::Major);
    }

    #[test]
    fn test_rust_analysis() {
        let analysis = Analysis::new(RUST, Language::Rust);
        let metrics = analysis.line_metrics();
        assert_eq!(metrics.comment, 4);

        let structure = analysis.structure();
        assert_eq!(structure.types, ["Point", "Shape"]);
        let functions: Vec<_> = structure
            .functions
            .iter()
            .map(|f| (f.name.as_str(), f.line, f.end_line, f.documented))
            .collect();
        assert_eq!(
            functions,
            [
                ("new", 10, 12, true),
                ("double", 15, 17, false),
                ("area", 21, 21, false),
            ]
        );
        // `if` and `else`'s block are one statement; the comment is ignored.
        assert_eq!(analysis.control_flow_count(), 1);

        let issues = analysis.detect_issues();
        assert!(issues.iter().any(|i| i.line == 16 && i.title == "TODO/FIXME comment"));
    }

    #[test]
    fn test_long_lines() {
        let text = format!("let x = 1;\n{}\n", "a".repeat(121));
        let issues = Analysis::new(&text, Language::Other).detect_issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 2);
        assert_eq!(
            issues[0].description,
            "Line has 121 characters (recommended max: 120)"
        );
    }
}
