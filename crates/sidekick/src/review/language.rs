use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Languages with structure detection. Other files get line metrics and
/// text-level issue checks only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Java,
    Other,
}

impl Language {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "py" | "pyw" => Language::Python,
            "rs" => Language::Rust,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "java" => Language::Java,
            _ => Language::Other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::Rust => "Rust",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Java => "Java",
            Language::Other => "Other",
        }
    }

    /// What the language calls its user-defined types.
    pub fn type_label(self) -> &'static str {
        match self {
            Language::Rust => "Types",
            _ => "Classes",
        }
    }

    /// Python blocks are delimited by indentation, the rest by braces.
    #[inline]
    pub fn uses_braces(self) -> bool {
        !matches!(self, Language::Python)
    }

    pub fn line_comment(self) -> &'static str {
        match self {
            Language::Python => "#",
            _ => "//",
        }
    }

    #[inline]
    pub fn has_block_comments(self) -> bool {
        !matches!(self, Language::Python | Language::Other)
    }

    pub(super) fn patterns(self) -> Option<&'static Patterns> {
        match self {
            Language::Python => Some(&PYTHON),
            Language::Rust => Some(&RUST),
            Language::JavaScript => Some(&JAVASCRIPT),
            Language::TypeScript => Some(&TYPESCRIPT),
            Language::Java => Some(&JAVA),
            Language::Other => None,
        }
    }
}

/// Line-level patterns. Every function and type pattern captures the name
/// in its first group.
pub(super) struct Patterns {
    pub functions: Vec<Regex>,
    pub types: Vec<Regex>,
    /// Matches one control-flow statement; counted per occurrence.
    pub control_flow: Regex,
}

/// Words that look like method names to the Java pattern.
pub(super) const NOT_FUNCTION_NAMES: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "new", "else", "do",
    "try", "synchronized",
];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

static PYTHON: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    functions: compile(&[r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\("]),
    types: compile(&[r"^\s*class\s+([A-Za-z_]\w*)"]),
    control_flow: Regex::new(
        r"^\s*(?:if|elif|while|for|try|with|async\s+for|async\s+with)\b",
    )
    .unwrap(),
});

static RUST: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    functions: compile(&[
        r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+([A-Za-z_]\w*)"#,
    ]),
    types: compile(&[
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:struct|enum|trait|union)\s+([A-Za-z_]\w*)",
    ]),
    control_flow: Regex::new(r"\b(?:if|while|for|loop|match)\b").unwrap(),
});

const JS_FUNCTIONS: &[&str] = &[
    r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)",
    r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:async\s+)?(?:function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)",
];
const JS_CONTROL_FLOW: &str = r"\b(?:if|while|for|switch|try|do)\b";

static JAVASCRIPT: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    functions: compile(JS_FUNCTIONS),
    types: compile(&[
        r"^\s*(?:export\s+)?(?:default\s+)?class\s+([A-Za-z_$][\w$]*)",
    ]),
    control_flow: Regex::new(JS_CONTROL_FLOW).unwrap(),
});

static TYPESCRIPT: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    functions: compile(JS_FUNCTIONS),
    types: compile(&[
        r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?(?:class|interface|enum)\s+([A-Za-z_$][\w$]*)",
    ]),
    control_flow: Regex::new(JS_CONTROL_FLOW).unwrap(),
});

static JAVA: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    functions: compile(&[
        r"^\s*(?:(?:public|private|protected|static|final|abstract|synchronized|native|default)\s+)*(?:<[^>]*>\s*)?[\w<>\[\],.?]+(?:\s*\[\])*\s+([A-Za-z_]\w*)\s*\([^;]*$",
    ]),
    types: compile(&[
        r"^\s*(?:(?:public|private|protected|static|final|abstract|sealed)\s+)*(?:class|interface|enum|record)\s+([A-Za-z_]\w*)",
    ]),
    control_flow: Regex::new(r"\b(?:if|while|for|switch|try|do)\b").unwrap(),
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path(Path::new("a/b.py")), Language::Python);
        assert_eq!(Language::from_path(Path::new("lib.RS")), Language::Rust);
        assert_eq!(Language::from_path(Path::new("x.tsx")), Language::TypeScript);
        assert_eq!(Language::from_path(Path::new("Makefile")), Language::Other);
    }
}
