//! Declarative YAML check suites

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CheckError, CheckResult};
use crate::page::Viewport;

/// A set of checks to run against one page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckSuite {
    /// Unique name for this suite
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Tags for filtering suites
    #[serde(default)]
    pub tags: Vec<String>,

    /// Page under test
    pub url: String,

    /// Viewport for the page checks; `switch_scheme` uses its own
    #[serde(default)]
    pub viewport: Viewport,

    pub checks: Vec<CheckSpec>,
}

/// A single check with its parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum CheckSpec {
    ColorScheme,

    SwitchScheme,

    BlockFullScreen {
        selector: String,
    },

    SemanticTags {
        tags: Vec<String>,
    },

    ResetMargins {
        tags: Vec<String>,
    },

    BackgroundFixed {
        selector: String,
    },
}

impl CheckSpec {
    pub fn name(&self) -> &'static str {
        match self {
            CheckSpec::ColorScheme => "color_scheme",
            CheckSpec::SwitchScheme => "switch_scheme",
            CheckSpec::BlockFullScreen { .. } => "block_full_screen",
            CheckSpec::SemanticTags { .. } => "semantic_tags",
            CheckSpec::ResetMargins { .. } => "reset_margins",
            CheckSpec::BackgroundFixed { .. } => "background_fixed",
        }
    }

    /// Whether the check opens its own browser instead of sharing the page
    pub fn needs_own_session(&self) -> bool {
        matches!(self, CheckSpec::SwitchScheme)
    }
}

impl CheckSuite {
    /// Parse a suite from YAML string
    pub fn from_yaml(yaml: &str) -> CheckResult<Self> {
        let suite: Self = serde_yaml::from_str(yaml)?;
        if suite.checks.is_empty() {
            return Err(CheckError::SuiteParse(format!("suite '{}' has no checks", suite.name)));
        }
        Ok(suite)
    }

    /// Parse a suite from a YAML file
    pub fn from_file(path: &Path) -> CheckResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| CheckError::SuiteParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all suites from a directory
    pub fn load_all(dir: &Path) -> CheckResult<Vec<Self>> {
        let mut suites = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            suites.push(Self::from_file(entry.path())?);
        }

        Ok(suites)
    }

    /// Filter suites by tag
    pub fn filter_by_tag<'a>(suites: &'a [Self], tag: &str) -> Vec<&'a Self> {
        suites.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suite() {
        let yaml = r#"
name: landing
description: Landing page layout
tags:
  - smoke
url: http://127.0.0.1:8080/index.html
checks:
  - check: color_scheme
  - check: semantic_tags
    tags: [header, main, footer]
  - check: block_full_screen
    selector: .hero
  - check: switch_scheme
"#;
        let suite = CheckSuite::from_yaml(yaml).unwrap();
        assert_eq!(suite.name, "landing");
        assert_eq!(suite.viewport, Viewport { width: 1024, height: 768 });
        assert_eq!(suite.checks.len(), 4);
        assert_eq!(
            suite.checks[1],
            CheckSpec::SemanticTags {
                tags: vec!["header".into(), "main".into(), "footer".into()]
            }
        );
        assert!(suite.checks[3].needs_own_session());
    }

    #[test]
    fn test_empty_suite_rejected() {
        let err = CheckSuite::from_yaml("name: empty\nurl: http://localhost\nchecks: []\n").unwrap_err();
        assert!(matches!(err, CheckError::SuiteParse(_)));
    }

    #[test]
    fn test_unknown_check_rejected() {
        let yaml = "name: bad\nurl: http://localhost\nchecks:\n  - check: font_size\n";
        assert!(CheckSuite::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_load_all_and_filter() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.yaml"),
            "name: a\ntags: [smoke]\nurl: http://localhost\nchecks:\n  - check: color_scheme\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.yml"),
            "name: b\nurl: http://localhost\nchecks:\n  - check: switch_scheme\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let suites = CheckSuite::load_all(dir.path()).unwrap();
        assert_eq!(suites.len(), 2);
        assert_eq!(suites[0].name, "a");

        let smoke = CheckSuite::filter_by_tag(&suites, "smoke");
        assert_eq!(smoke.len(), 1);
        assert_eq!(smoke[0].name, "a");
    }
}
