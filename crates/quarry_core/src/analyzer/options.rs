//! Analyzer configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{QuarryError, QuarryResult};
use crate::parser::ast::SourceType;

/// Which grammar a source is parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTypeOption {
    /// Module first, then script if the module grammar rejects the source.
    #[default]
    Auto,
    Module,
    Script,
}

impl SourceTypeOption {
    /// Grammars to try, in order.
    pub fn attempts(self) -> &'static [SourceType] {
        match self {
            SourceTypeOption::Auto => &[SourceType::Module, SourceType::Script],
            SourceTypeOption::Module => &[SourceType::Module],
            SourceTypeOption::Script => &[SourceType::Script],
        }
    }
}

impl FromStr for SourceTypeOption {
    type Err = QuarryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(SourceTypeOption::Auto),
            "module" => Ok(SourceTypeOption::Module),
            "script" => Ok(SourceTypeOption::Script),
            other => Err(QuarryError::Config(format!(
                "unknown source type {other:?} (expected auto, module or script)"
            ))),
        }
    }
}

impl fmt::Display for SourceTypeOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceTypeOption::Auto => "auto",
            SourceTypeOption::Module => "module",
            SourceTypeOption::Script => "script",
        })
    }
}

/// Options for an [`Analyzer`](crate::Analyzer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalyzerOptions {
    pub source_type: SourceTypeOption,
    /// Prefix that marks a comment as carrying options, e.g. `webpack` for
    /// `/* webpackChunkName: "a" */`.
    pub magic_comment_prefix: String,
    /// Keep comments for [`Walker::get_comments`](crate::Walker::get_comments)
    /// and the `program` hook.  Without them, `/*#__PURE__*/` annotations and
    /// magic comments are not seen.
    pub collect_comments: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            source_type: SourceTypeOption::Auto,
            magic_comment_prefix: "webpack".to_string(),
            collect_comments: true,
        }
    }
}

impl AnalyzerOptions {
    /// Check the options for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Config`] for an empty or non-identifier magic
    /// comment prefix.
    pub fn validate(&self) -> QuarryResult<()> {
        let prefix = &self.magic_comment_prefix;
        if prefix.is_empty() {
            return Err(QuarryError::Config("magicCommentPrefix must not be empty".into()));
        }
        if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            return Err(QuarryError::Config(format!(
                "magicCommentPrefix {prefix:?} must be an identifier"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults() {
        let options = AnalyzerOptions::default();
        assert_eq!(options.source_type, SourceTypeOption::Auto);
        assert_eq!(options.magic_comment_prefix, "webpack");
        assert!(options.collect_comments);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let options: AnalyzerOptions =
            serde_json::from_str(r#"{ "sourceType": "script", "magicCommentPrefix": "vite" }"#)
                .expect("valid options");
        assert_eq!(
            options,
            AnalyzerOptions {
                source_type: SourceTypeOption::Script,
                magic_comment_prefix: "vite".into(),
                collect_comments: true,
            }
        );
        assert!(serde_json::from_str::<AnalyzerOptions>(r#"{ "sourcetype": "module" }"#).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        for prefix in ["", "web pack", "a.b"] {
            let options = AnalyzerOptions {
                magic_comment_prefix: prefix.into(),
                ..AnalyzerOptions::default()
            };
            assert!(matches!(options.validate(), Err(QuarryError::Config(_))), "{prefix:?}");
        }
    }

    #[test]
    fn test_source_type_round_trips_through_str() {
        for option in [SourceTypeOption::Auto, SourceTypeOption::Module, SourceTypeOption::Script] {
            assert_eq!(option.to_string().parse::<SourceTypeOption>(), Ok(option));
        }
        assert!("esm".parse::<SourceTypeOption>().is_err());
        assert_eq!(SourceTypeOption::Auto.attempts(), &[SourceType::Module, SourceType::Script]);
    }
}
