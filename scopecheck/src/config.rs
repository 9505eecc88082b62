#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use scopecheck_core::{AnalysisOptions, Engine, RuleConfig, RuleId};
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "scopecheck.toml";

#[derive(Debug, Error, Diagnostic)]
#[allow(unused_assignments)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    #[diagnostic(code(scopecheck::config::read))]
    Read { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(scopecheck::config::parse))]
    Parse {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("unknown rule id `{id}` in [rules]")]
    #[diagnostic(
        code(scopecheck::config::rule),
        help("run `scopecheck rules` to list the available rules")
    )]
    UnknownRule { id: String },
}

/// Contents of `scopecheck.toml`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub analysis: AnalysisOptions,
    pub rules: BTreeMap<String, RuleConfig>,
}

impl ConfigFile {
    pub fn parse(name: &str, raw: &str) -> Result<Self, ConfigError> {
        let parsed: ConfigFile = toml::from_str(raw).map_err(|e| ConfigError::Parse {
            message: e.message().to_string(),
            src: NamedSource::new(name, raw.to_string()),
            span: e.span().map(|r| SourceSpan::from(r.start..r.end)),
        })?;
        for id in parsed.rules.keys() {
            if id.parse::<RuleId>().is_err() {
                return Err(ConfigError::UnknownRule { id: id.clone() });
            }
        }
        Ok(parsed)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&path.display().to_string(), &raw)
    }

    /// `scopecheck.toml` in `dir`, or defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Per-rule tables keyed by parsed id.
    pub fn rule_configs(&self) -> Result<Vec<(RuleId, RuleConfig)>, ConfigError> {
        self.rules
            .iter()
            .map(|(id, config)| {
                id.parse::<RuleId>()
                    .map(|id| (id, config.clone()))
                    .map_err(|_| ConfigError::UnknownRule { id: id.clone() })
            })
            .collect()
    }

    /// Engine with file settings, then command-line overrides applied.
    pub fn engine(&self, no_resolve: bool, only: &[RuleId]) -> Result<Engine, ConfigError> {
        let mut analysis = self.analysis.clone();
        if no_resolve {
            analysis.resolve_types = false;
        }
        let mut engine = Engine::new(analysis);
        for (id, config) in self.rule_configs()? {
            engine.configure_rule(id, &config);
        }
        engine.restrict(only);
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = ConfigFile::parse("scopecheck.toml", "").unwrap();
        assert!(config.analysis.resolve_types);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn parse_errors_point_into_the_file() {
        let raw = "[analysis]\nresolve_types = \"yes\"\n";
        match ConfigFile::parse("scopecheck.toml", raw) {
            Err(ConfigError::Parse { span, .. }) => assert!(span.is_some()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn no_resolve_overrides_the_file() {
        let config = ConfigFile::parse("scopecheck.toml", "[analysis]\nresolve_types = true\n").unwrap();
        let engine = config.engine(true, &[]).unwrap();
        assert!(!engine.options().resolve_types);
    }
}
