//! Minimum API version extraction from documentation text.
//!
//! A documentation block is scanned line by line. `***Since:***` lines become
//! version annotations and are dropped from the prose; enum documentation
//! additionally carries a `Possible values:` list whose entries collect their
//! own prose and versions.

use once_cell::sync::Lazy;
use regex::Regex;

/// `***Since:*** vSphere API Release 8.0.1.0` captures `8.0.1.0`.
static SINCE_API: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\*\*\*Since:\*\*\* \w+? API (?:Release )?(.+)$").expect("valid regex")
});

/// ``- `value`: description``
static POSSIBLE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^- `([^`]+?)`(?:: (.*))?$").expect("valid regex"));

static ENCLOSED_BY_ASTERISK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^\s]+)\*").expect("valid regex"));

const POSSIBLE_VALUES_HEADER: &str = "Possible values:";

/// Version captured from a `Since` line, if the line is one.
pub fn since_version(line: &str) -> Option<&str> {
    SINCE_API
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_end())
}

/// Rewrite one documentation line for a host comment.
pub fn sanitize_line(line: &str) -> String {
    let line = line.replace("***Required privileges:***", "Required privileges:");
    let line = ENCLOSED_BY_ASTERISK.replace_all(&line, "`${1}`");
    if line.starts_with("- ") || line.starts_with("  ") {
        format!("    {}", line)
    } else {
        line.into_owned()
    }
}

/// Render prose lines as `//` comments, one per line.
pub fn comment_lines(prose: &[String], indent: &str) -> String {
    let mut out = String::new();
    for line in prose {
        let comment = format!("// {}", sanitize_line(line));
        out.push_str(indent);
        out.push_str(comment.trim_end());
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Plain,
    InPossibleValues,
    InValueDescription,
}

/// Documentation of one enum value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueDoc {
    pub value: String,
    pub prose: Vec<String>,
    pub version: Option<String>,
}

/// Result of scanning one documentation block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    pub prose: Vec<String>,
    pub version: Option<String>,
    pub values: Vec<ValueDoc>,
}

impl DocBlock {
    /// Scan a type or field description: only `Since` lines are special.
    pub fn scan_prose(text: &str) -> Self {
        let mut block = DocBlock::default();
        for line in text.lines() {
            match since_version(line) {
                Some(v) => block.record_type_version(v),
                None => block.prose.push(line.to_string()),
            }
        }
        block
    }

    /// Scan an enum description, including its `Possible values:` list.
    pub fn scan_enum(text: &str) -> Self {
        let mut block = DocBlock::default();
        let mut state = ScanState::Plain;

        for raw in text.lines() {
            if state == ScanState::Plain {
                if let Some(v) = since_version(raw) {
                    block.record_type_version(v);
                } else if raw.trim_end() == POSSIBLE_VALUES_HEADER {
                    drop_trailing_blank(&mut block.prose);
                    state = ScanState::InPossibleValues;
                } else {
                    block.prose.push(raw.to_string());
                }
                continue;
            }

            // An indented empty line continues a value description.
            if raw.is_empty() {
                state = ScanState::Plain;
                continue;
            }

            if let Some(caps) = POSSIBLE_VALUE.captures(raw) {
                let mut value = ValueDoc {
                    value: caps[1].to_string(),
                    ..ValueDoc::default()
                };
                if let Some(desc) = caps.get(2) {
                    match since_version(desc.as_str()) {
                        Some(v) => value.version = Some(v.to_string()),
                        None => value.prose.push(desc.as_str().to_string()),
                    }
                }
                block.values.push(value);
                state = ScanState::InValueDescription;
                continue;
            }

            let line = raw.strip_prefix("  ").unwrap_or(raw);
            match (state, block.values.last_mut()) {
                (ScanState::InValueDescription, Some(value)) => match since_version(line) {
                    Some(v) => {
                        drop_trailing_blank(&mut value.prose);
                        if value.version.is_none() {
                            value.version = Some(v.to_string());
                        }
                    }
                    None => value.prose.push(line.to_string()),
                },
                _ => match since_version(line) {
                    Some(v) => block.record_type_version(v),
                    None => block.prose.push(raw.to_string()),
                },
            }
        }

        block
    }

    fn record_type_version(&mut self, version: &str) {
        drop_trailing_blank(&mut self.prose);
        if self.version.is_none() {
            self.version = Some(version.to_string());
        }
    }

    pub fn value(&self, value: &str) -> Option<&ValueDoc> {
        self.values.iter().find(|v| v.value == value)
    }

    /// (value, version) pairs for values carrying a version, in list order.
    pub fn value_versions(&self) -> Vec<(&str, &str)> {
        self.values
            .iter()
            .filter_map(|v| v.version.as_deref().map(|ver| (v.value.as_str(), ver)))
            .collect()
    }
}

fn drop_trailing_blank(prose: &mut Vec<String>) {
    if prose.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
        prose.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn since_pattern() {
        assert_eq!(since_version("***Since:*** vSphere API 7.0"), Some("7.0"));
        assert_eq!(
            since_version("***Since:*** vSphere API Release 8.0.1.0"),
            Some("8.0.1.0")
        );
        assert_eq!(since_version("Since: 7.0"), None);
        assert_eq!(since_version("  ***Since:*** vSphere API 7.0"), None);
    }

    #[test]
    fn type_version_removed_from_prose() {
        let block = DocBlock::scan_prose("Describes a host.\n\n***Since:*** vSphere API 7.0\n");
        assert_eq!(block.version.as_deref(), Some("7.0"));
        assert_eq!(block.prose, vec!["Describes a host."]);
    }

    #[test]
    fn first_since_wins() {
        let block = DocBlock::scan_prose("***Since:*** vSphere API 6.5\n***Since:*** vSphere API 7.0");
        assert_eq!(block.version.as_deref(), Some("6.5"));
        assert!(block.prose.is_empty());
    }

    #[test]
    fn enum_possible_values() {
        let text = "The power state.\n\
                    \n\
                    Possible values:\n\
                    - `on`: Powered on.\n\
                    - `off`\n  Powered off.\n  \n  ***Since:*** vSphere API 8.0\n\
                    - `suspended`: ***Since:*** vSphere API 7.0\n\
                    \n\
                    ***Since:*** vSphere API 6.0\n";
        let block = DocBlock::scan_enum(text);

        assert_eq!(block.prose, vec!["The power state."]);
        assert_eq!(block.version.as_deref(), Some("6.0"));
        assert_eq!(block.values.len(), 3);

        let on = block.value("on").unwrap();
        assert_eq!(on.prose, vec!["Powered on."]);
        assert_eq!(on.version, None);

        let off = block.value("off").unwrap();
        assert_eq!(off.prose, vec!["Powered off."]);
        assert_eq!(off.version.as_deref(), Some("8.0"));

        assert_eq!(
            block.value_versions(),
            vec![("off", "8.0"), ("suspended", "7.0")]
        );
    }

    #[test]
    fn blank_line_returns_to_plain() {
        let text = "Possible values:\n- `a`\n\nTrailing prose.";
        let block = DocBlock::scan_enum(text);
        assert_eq!(block.values.len(), 1);
        assert_eq!(block.prose, vec!["Trailing prose."]);
    }

    #[test]
    fn scanning_is_deterministic() {
        let text = "Intro\nPossible values:\n- `x`: X\n***Since:*** vSphere API 7.0";
        assert_eq!(DocBlock::scan_enum(text), DocBlock::scan_enum(text));
    }

    #[test]
    fn sanitize_rewrites_markup() {
        assert_eq!(
            sanitize_line("***Required privileges:*** System.View"),
            "Required privileges: System.View"
        );
        assert_eq!(sanitize_line("See *HostSystem* here"), "See `HostSystem` here");
        assert_eq!(sanitize_line("- item"), "    - item");
        assert_eq!(sanitize_line("  continued"), "      continued");
    }

    #[test]
    fn comments_trim_empty_lines() {
        let prose = vec!["First".to_string(), String::new()];
        assert_eq!(comment_lines(&prose, "\t"), "\t// First\n\t//\n");
    }
}
