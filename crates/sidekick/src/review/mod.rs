//! Static code review: line metrics, structure, complexity and common
//! issues, computed without compiling or parsing the code.

mod analysis;
mod language;
pub mod tools;

use std::fmt::Write;
use std::path::Path;
use std::{fs, io};

use thiserror::Error;

pub use analysis::{
    Analysis, Definition, Issue, LineMetrics, MAX_LINE_LENGTH, Severity,
    Structure,
};
pub use language::Language;

/// Larger files are refused.
pub const MAX_FILE_CHARS: usize = 100_000;

/// Definitions listed by name in the structure report.
const LISTED_DEFINITIONS: usize = 10;
const LISTED_LONGEST: usize = 5;
const LISTED_MAJOR: usize = 5;
/// Estimated complexity above this is flagged in the metrics report.
const MAX_COMPLEXITY: usize = 10;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("File not found - {0}")]
    NotFound(String),
    #[error("File too large - {path} has {chars} characters (max {max})", max = MAX_FILE_CHARS)]
    TooLarge { path: String, chars: usize },
    #[error("could not read {path}: {source}")]
    Io { path: String, source: io::Error },
}

impl ReviewError {
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, ReviewError::Io { .. })
    }
}

/// A loaded source file ready for analysis.
#[derive(Debug)]
pub struct SourceFile {
    path: String,
    language: Language,
    text: String,
}

impl SourceFile {
    pub fn load(path: &str) -> Result<Self, ReviewError> {
        let file = Path::new(path);
        if !file.is_file() {
            return Err(ReviewError::NotFound(path.to_owned()));
        }
        let text = fs::read_to_string(file).map_err(|source| ReviewError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_text(path, text)
    }

    pub fn from_text(path: &str, text: String) -> Result<Self, ReviewError> {
        let chars = text.chars().count();
        if chars > MAX_FILE_CHARS {
            return Err(ReviewError::TooLarge {
                path: path.to_owned(),
                chars,
            });
        }
        Ok(Self {
            path: path.to_owned(),
            language: Language::from_path(Path::new(path)),
            text,
        })
    }

    #[inline]
    pub fn language(&self) -> Language {
        self.language
    }

    pub fn analysis(&self) -> Analysis<'_> {
        Analysis::new(&self.text, self.language)
    }

    /// Line counts and the functions and types defined in the file.
    pub fn structure_report(&self) -> String {
        let analysis = self.analysis();
        let metrics = analysis.line_metrics();
        let mut out = format!("Code Analysis for {}:\n\n", self.path);
        out.push_str("Lines of Code:\n");
        let _ = writeln!(out, "  Total: {}", metrics.total);
        let _ = writeln!(out, "  Code: {}", metrics.code);
        let _ = writeln!(out, "  Comments: {}", metrics.comment);
        let _ = writeln!(out, "  Blank: {}\n", metrics.blank);

        if self.language == Language::Other {
            return out;
        }
        let structure = analysis.structure();
        let _ = writeln!(out, "{} Structure:", self.language.name());
        let names: Vec<&str> =
            structure.functions.iter().map(|f| f.name.as_str()).collect();
        push_names(&mut out, "Functions", &names);
        let types: Vec<&str> = structure.types.iter().map(String::as_str).collect();
        push_names(&mut out, self.language.type_label(), &types);
        out
    }

    /// Complexity estimate and function lengths.
    pub fn metrics_report(&self) -> String {
        let mut out = format!("Code Metrics for {}:\n\n", self.path);
        if self.language == Language::Other {
            out.push_str(
                "Complexity metrics are only available for Python, Rust, JavaScript, TypeScript and Java files.\n",
            );
            return out;
        }

        let analysis = self.analysis();
        let control_flow = analysis.control_flow_count();
        out.push_str("Complexity:\n");
        let _ = writeln!(out, "  Control Flow Statements: {control_flow}");
        let _ = writeln!(
            out,
            "  Estimated Cyclomatic Complexity: {}",
            control_flow + 1
        );
        if control_flow + 1 > MAX_COMPLEXITY {
            let _ = writeln!(
                out,
                "  Warning: complexity is above the recommended maximum of {MAX_COMPLEXITY}"
            );
        }
        out.push('\n');

        let mut functions = analysis.structure().functions;
        if functions.is_empty() {
            return out;
        }
        functions.sort_by(|a, b| b.length().cmp(&a.length()));
        out.push_str("Function Lengths:\n");
        let _ = writeln!(out, "  Total Functions: {}", functions.len());
        let _ = writeln!(out, "  Longest Function: {} lines", functions[0].length());
        out.push_str("\n  Top 5 Longest Functions:\n");
        for function in functions.iter().take(LISTED_LONGEST) {
            let _ = writeln!(out, "    - {}: {} lines", function.name, function.length());
        }
        out
    }

    /// Issues grouped by severity.
    pub fn issues_report(&self) -> String {
        let issues = self.analysis().detect_issues();
        if issues.is_empty() {
            return format!("No issues detected in {}. Code looks good!", self.path);
        }

        let mut out = format!("Found {} issues in {}:\n\n", issues.len(), self.path);
        let (major, minor): (Vec<&Issue>, Vec<&Issue>) = issues
            .iter()
            .partition(|issue| issue.severity == Severity::Major);
        if !major.is_empty() {
            let _ = writeln!(out, "MAJOR ({}):", major.len());
            for issue in major.iter().take(LISTED_MAJOR) {
                let _ = writeln!(
                    out,
                    "  Line {}: {} - {}",
                    issue.line, issue.title, issue.description
                );
            }
            if major.len() > LISTED_MAJOR {
                let _ = writeln!(out, "  ... and {} more", major.len() - LISTED_MAJOR);
            }
            out.push('\n');
        }
        if !minor.is_empty() {
            let _ = writeln!(
                out,
                "MINOR ({}): {} minor issues found",
                minor.len(),
                minor.len()
            );
        }
        out
    }
}

fn push_names(out: &mut String, label: &str, names: &[&str]) {
    let _ = writeln!(out, "  {label}: {}", names.len());
    if !names.is_empty() {
        let listed = &names[..names.len().min(LISTED_DEFINITIONS)];
        let _ = writeln!(out, "    {}", listed.join(", "));
    }
}

/// The request sent to the review assistant for a whole file.
pub fn review_prompt(path: &str) -> String {
    format!(
        "Please perform a comprehensive code review of the file: {path}

Follow these steps:
1. Use analyze_code to understand the structure
2. Use check_code_metrics to evaluate complexity
3. Use detect_issues to find problems
4. Provide a detailed review with:
   - Summary of the code
   - Issues found (grouped by severity)
   - Specific suggestions for improvement
   - Overall code quality assessment"
    )
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    const SAMPLE: &str = "def a():\n    \"\"\"Doc.\"\"\"\n    if True:\n        return 1\n\n\ndef b():\n    return 2\n";

    #[test]
    fn test_missing_and_oversized_files() {
        let err = SourceFile::load("definitely/not/here.py").unwrap_err();
        assert_eq!(err.to_string(), "File not found - definitely/not/here.py");
        assert!(err.is_invalid_input());

        let err = SourceFile::from_text("big.py", "x".repeat(MAX_FILE_CHARS + 1))
            .unwrap_err();
        assert!(matches!(err, ReviewError::TooLarge { chars, .. } if chars == MAX_FILE_CHARS + 1));
    }

    #[test]
    fn test_reports() {
        let mut file = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let path = file.path().to_str().unwrap().to_owned();
        let source = SourceFile::load(&path).unwrap();
        assert_eq!(source.language(), Language::Python);

        let structure = source.structure_report();
        assert!(structure.starts_with(&format!("Code Analysis for {path}:\n\n")));
        assert!(structure.contains("  Total: 9\n  Code: 6\n  Comments: 0\n  Blank: 3\n"));
        assert!(structure.contains("Python Structure:\n  Functions: 2\n    a, b\n  Classes: 0\n"));

        let metrics = source.metrics_report();
        assert!(metrics.contains("  Control Flow Statements: 1\n  Estimated Cyclomatic Complexity: 2\n"));
        assert!(metrics.contains("  Longest Function: 3 lines\n"));
        assert!(metrics.contains("    - a: 3 lines\n    - b: 1 lines\n"));

        let issues = source.issues_report();
        assert_eq!(
            issues,
            format!("Found 1 issues in {path}:\n\nMINOR (1): 1 minor issues found\n")
        );
    }

    #[test]
    fn test_major_issues_are_capped() {
        let text = "try:\n    pass\nexcept:\n    pass\n".repeat(7);
        let source = SourceFile::from_text("many.py", text).unwrap();
        let report = source.issues_report();
        assert!(report.starts_with("Found 7 issues in many.py:\n\nMAJOR (7):\n"));
        assert!(report.contains("  Line 3: Bare except clause - Use specific exception types instead of bare 'except:'\n"));
        assert!(report.contains("  ... and 2 more\n"));
        assert!(!report.contains("MINOR"));
    }

    #[test]
    fn test_clean_file() {
        let source = SourceFile::from_text("x.txt", "hello\n".to_owned()).unwrap();
        assert_eq!(source.issues_report(), "No issues detected in x.txt. Code looks good!");
        assert!(source.metrics_report().contains("only available for"));
    }
}
