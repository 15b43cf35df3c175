//! Markdown and plain-text research reports.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use chrono::NaiveDateTime;
use regex::Regex;

use super::{ResearchError, Source};

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static FILENAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

const RULE_WIDTH: usize = 80;

/// Layout of a generated report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportTemplate {
    #[default]
    Structured,
    Summary,
    Detailed,
}

impl FromStr for ReportTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structured" => Ok(Self::Structured),
            "summary" => Ok(Self::Summary),
            "detailed" => Ok(Self::Detailed),
            other => Err(format!("unknown report template '{other}'")),
        }
    }
}

/// How sources are cited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CitationFormat {
    #[default]
    Markdown,
    /// Simplified APA.
    Apa,
    /// Simplified MLA.
    Mla,
    Plain,
}

impl FromStr for CitationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" => Ok(Self::Markdown),
            "apa" => Ok(Self::Apa),
            "mla" => Ok(Self::Mla),
            "plain" => Ok(Self::Plain),
            other => Err(format!("unknown citation format '{other}'")),
        }
    }
}

impl fmt::Display for CitationFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Markdown => "markdown",
            Self::Apa => "apa",
            Self::Mla => "mla",
            Self::Plain => "plain",
        })
    }
}

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Assembles reports from research results.
#[derive(Clone)]
pub struct ReportGenerator {
    template: ReportTemplate,
    citation_format: CitationFormat,
    include_citations: bool,
    output_dir: PathBuf,
    clock: Clock,
}

impl fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("template", &self.template)
            .field("citation_format", &self.citation_format)
            .field("include_citations", &self.include_citations)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl ReportGenerator {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            template: ReportTemplate::default(),
            citation_format: CitationFormat::default(),
            include_citations: true,
            output_dir: output_dir.into(),
            clock: Arc::new(crate::clock::now),
        }
    }

    #[inline]
    pub fn with_template(mut self, template: ReportTemplate) -> Self {
        self.template = template;
        self
    }

    #[inline]
    pub fn with_citation_format(mut self, format: CitationFormat) -> Self {
        self.citation_format = format;
        self
    }

    #[inline]
    pub fn with_citations(mut self, include: bool) -> Self {
        self.include_citations = include;
        self
    }

    /// Replaces the clock used for "generated" timestamps and citation
    /// dates.
    #[inline]
    pub fn with_clock(
        mut self,
        clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static,
    ) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    #[inline]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Renders a report with the configured template.
    ///
    /// `sections` are extra `(name, content)` sections, rendered in order
    /// after the findings. The summary template ignores them.
    pub fn generate_report(
        &self,
        topic: &str,
        summary: &str,
        findings: &[String],
        sources: &[Source],
        sections: &[(String, String)],
    ) -> String {
        let now = (self.clock)();
        match self.template {
            ReportTemplate::Structured => self
                .structured(now, topic, summary, findings, sources, sections),
            ReportTemplate::Summary => {
                self.summary(topic, summary, findings, sources)
            }
            ReportTemplate::Detailed => {
                self.detailed(now, topic, summary, findings, sources, sections)
            }
        }
    }

    fn structured(
        &self,
        now: NaiveDateTime,
        topic: &str,
        summary: &str,
        findings: &[String],
        sources: &[Source],
        sections: &[(String, String)],
    ) -> String {
        let mut lines = vec![
            format!("# Research Report: {topic}"),
            format!("\n**Generated:** {}", now.format("%Y-%m-%d %H:%M:%S")),
            format!("**Sources:** {}\n", sources.len()),
            "---\n".to_owned(),
            "## Executive Summary\n".to_owned(),
            summary.to_owned(),
            "\n".to_owned(),
        ];

        if !findings.is_empty() {
            lines.push("## Key Findings\n".to_owned());
            lines.extend(
                findings
                    .iter()
                    .enumerate()
                    .map(|(i, finding)| format!("{}. {finding}", i + 1)),
            );
            lines.push("\n".to_owned());
        }

        for (name, content) in sections {
            lines.push(format!("## {name}\n"));
            lines.push(content.clone());
            lines.push("\n".to_owned());
        }

        if self.include_citations && !sources.is_empty() {
            lines.push("## Sources and References\n".to_owned());
            lines.extend(self.citations(now, sources));
        }

        lines.join("\n")
    }

    fn summary(
        &self,
        topic: &str,
        summary: &str,
        findings: &[String],
        sources: &[Source],
    ) -> String {
        let mut lines = vec![
            format!("# {topic}\n"),
            summary.to_owned(),
            "\n**Key Points:**\n".to_owned(),
        ];
        lines.extend(findings.iter().map(|finding| format!("- {finding}")));

        if self.include_citations && !sources.is_empty() {
            lines.push("\n**Sources:**".to_owned());
            lines.extend(
                sources
                    .iter()
                    .map(|source| format!("- {}: {}", source.title, source.url)),
            );
        }

        lines.join("\n")
    }

    fn detailed(
        &self,
        now: NaiveDateTime,
        topic: &str,
        summary: &str,
        findings: &[String],
        sources: &[Source],
        sections: &[(String, String)],
    ) -> String {
        let heavy = "=".repeat(RULE_WIDTH);
        let light = "-".repeat(RULE_WIDTH);
        let section_end = format!("\n{heavy}\n");
        let references = sections.len() + 3;

        let mut lines = vec![
            heavy.clone(),
            topic.to_uppercase(),
            "Research Report".to_owned(),
            format!("Generated: {}", now.format("%B %d, %Y")),
            heavy.clone(),
            "\n".to_owned(),
            "TABLE OF CONTENTS".to_owned(),
            light.clone(),
            "1. Executive Summary".to_owned(),
            "2. Key Findings".to_owned(),
        ];
        lines.extend(
            sections
                .iter()
                .enumerate()
                .map(|(i, (name, _))| format!("{}. {name}", i + 3)),
        );
        lines.push(format!("{references}. References"));
        lines.push(section_end.clone());

        lines.push("1. EXECUTIVE SUMMARY".to_owned());
        lines.push(light.clone());
        lines.push(summary.to_owned());
        lines.push(section_end.clone());

        lines.push("2. KEY FINDINGS".to_owned());
        lines.push(light.clone());
        lines.extend(
            findings
                .iter()
                .enumerate()
                .map(|(i, finding)| format!("\n{}. {finding}", i + 1)),
        );
        lines.push(section_end.clone());

        for (i, (name, content)) in sections.iter().enumerate() {
            lines.push(format!("{}. {}", i + 3, name.to_uppercase()));
            lines.push(light.clone());
            lines.push(content.clone());
            lines.push(section_end.clone());
        }

        lines.push(format!("{references}. REFERENCES"));
        lines.push(light);
        lines.extend(self.citations(now, sources));

        lines.join("\n")
    }

    fn citations(&self, now: NaiveDateTime, sources: &[Source]) -> Vec<String> {
        let mut lines = Vec::with_capacity(sources.len());
        for (i, source) in sources.iter().enumerate() {
            let n = i + 1;
            let title = if source.title.is_empty() {
                "Unknown Title"
            } else {
                &source.title
            };
            let url = &source.url;
            match self.citation_format {
                CitationFormat::Markdown => {
                    lines.push(format!("{n}. [{title}]({url})"));
                    if !source.source.is_empty() {
                        lines.push(format!("   Source: {}", source.source));
                    }
                }
                CitationFormat::Apa => lines.push(format!(
                    "{n}. {title}. ({}). Retrieved from {url}",
                    now.format("%Y, %B %d")
                )),
                CitationFormat::Mla => lines.push(format!(
                    "{n}. \"{title}.\" Web. {}. <{url}>",
                    now.format("%d %B %Y")
                )),
                CitationFormat::Plain => {
                    lines.push(format!("{n}. {title} - {url}"))
                }
            }
        }
        lines
    }

    /// Lists the sources under a `# Bibliography` heading.
    pub fn create_bibliography(&self, sources: &[Source]) -> String {
        let mut lines = vec!["# Bibliography\n".to_owned()];
        lines.extend(self.citations((self.clock)(), sources));
        lines.join("\n")
    }

    /// Writes a report into the output directory and returns its path.
    ///
    /// The file name keeps word characters, spaces and dashes only; runs
    /// of spaces and dashes become a single dash, and `.md` is appended.
    pub fn save_report(
        &self,
        content: &str,
        filename: &str,
    ) -> Result<PathBuf, ResearchError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(safe_filename(filename));
        std::fs::write(&path, content)?;
        info!("report saved to {}", path.display());
        Ok(path)
    }
}

fn safe_filename(filename: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(filename, "");
    let mut name = FILENAME_SEPARATORS
        .replace_all(&cleaned, "-")
        .into_owned();
    if name.is_empty() {
        name.push_str("report");
    }
    if !name.ends_with(".md") {
        name.push_str(".md");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_clock() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    fn generator(template: ReportTemplate) -> ReportGenerator {
        ReportGenerator::new("reports")
            .with_template(template)
            .with_clock(fixed_clock)
    }

    fn sources() -> Vec<Source> {
        vec![Source {
            title: "Solar Basics".to_owned(),
            url: "https://energy.example.org/solar".to_owned(),
            snippet: "How panels work".to_owned(),
            source: "energy.example.org".to_owned(),
        }]
    }

    #[test]
    fn test_structured_report() {
        let report = generator(ReportTemplate::Structured).generate_report(
            "Solar Power",
            "Solar is growing.",
            &["Costs fell 90%".to_owned(), "Storage matters".to_owned()],
            &sources(),
            &[("Outlook".to_owned(), "Bright.".to_owned())],
        );
        let expected = "# Research Report: Solar Power\n\
\n**Generated:** 2024-03-05 14:30:00\n\
**Sources:** 1\n\n\
---\n\n\
## Executive Summary\n\n\
Solar is growing.\n\
\n\n\
## Key Findings\n\n\
1. Costs fell 90%\n\
2. Storage matters\n\
\n\n\
## Outlook\n\n\
Bright.\n\
\n\n\
## Sources and References\n\n\
1. [Solar Basics](https://energy.example.org/solar)\n   \
Source: energy.example.org";
        assert_eq!(report, expected);
    }

    #[test]
    fn test_structured_without_findings_or_citations() {
        let report = generator(ReportTemplate::Structured)
            .with_citations(false)
            .generate_report("Topic", "Summary", &[], &sources(), &[]);
        assert!(report.contains("Summary"));
        assert!(!report.contains("Key Findings"));
        assert!(!report.contains("Sources and References"));
        assert!(report.contains("**Sources:** 1"));
    }

    #[test]
    fn test_summary_report() {
        let report = generator(ReportTemplate::Summary).generate_report(
            "Tea",
            "Tea is popular.",
            &["Green tea has catechins".to_owned()],
            &sources(),
            &[],
        );
        assert_eq!(
            report,
            "# Tea\n\nTea is popular.\n\n**Key Points:**\n\n\
             - Green tea has catechins\n\n**Sources:**\n\
             - Solar Basics: https://energy.example.org/solar"
        );
    }

    #[test]
    fn test_detailed_numbers_references_after_sections() {
        let report = generator(ReportTemplate::Detailed).generate_report(
            "ai safety",
            "Summary",
            &["One".to_owned()],
            &sources(),
            &[
                ("Background".to_owned(), "b".to_owned()),
                ("Outlook".to_owned(), "o".to_owned()),
            ],
        );
        assert!(report.starts_with(&format!("{}\nAI SAFETY\n", "=".repeat(80))));
        assert!(report.contains("Generated: March 05, 2024"));
        assert!(report.contains("3. Background\n4. Outlook\n5. References\n"));
        assert!(report.contains("\n4. OUTLOOK\n"));
        assert!(report.contains("\n5. REFERENCES\n"));
        assert!(report.contains("\n\n1. One\n"));
    }

    #[test]
    fn test_citation_styles() {
        let apa = generator(ReportTemplate::Structured)
            .with_citation_format(CitationFormat::Apa)
            .create_bibliography(&sources());
        assert_eq!(
            apa,
            "# Bibliography\n\n1. Solar Basics. (2024, March 05). \
             Retrieved from https://energy.example.org/solar"
        );

        let mla = generator(ReportTemplate::Structured)
            .with_citation_format(CitationFormat::Mla)
            .create_bibliography(&sources());
        assert!(mla.ends_with(
            "1. \"Solar Basics.\" Web. 05 March 2024. \
             <https://energy.example.org/solar>"
        ));

        let plain = generator(ReportTemplate::Structured)
            .with_citation_format(CitationFormat::Plain)
            .create_bibliography(&sources());
        assert!(plain.ends_with("1. Solar Basics - https://energy.example.org/solar"));
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("research-AI & ethics?"), "research-AI-ethics.md");
        assert_eq!(safe_filename("a  --  b"), "a-b.md");
        assert_eq!(safe_filename("???"), "report.md");
    }

    #[test]
    fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let generator = ReportGenerator::new(dir.path().join("reports"));
        let path = generator.save_report("# Hi", "my report").unwrap();
        assert_eq!(path.file_name().unwrap(), "my-report.md");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "# Hi");
    }
}
