use std::path::Path;

use ilopt_core::{Dialect, Name};
use serde::{Deserialize, Serialize};

use crate::error::{OptimiserError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Typed,
    Loose,
}

impl DialectKind {
    pub fn dialect(self) -> Dialect {
        match self {
            DialectKind::Typed => Dialect::typed(),
            DialectKind::Loose => Dialect::loose(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimiserStep {
    Disambiguate,
    FullInline,
}

impl OptimiserStep {
    pub fn label(self) -> &'static str {
        match self {
            OptimiserStep::Disambiguate => "disambiguate",
            OptimiserStep::FullInline => "full_inline",
        }
    }
}

/// Contents of `ilopt.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptimiserSettings {
    #[serde(default = "default_dialect")]
    pub dialect: DialectKind,
    #[serde(default = "default_steps")]
    pub steps: Vec<OptimiserStep>,
    #[serde(default)]
    pub trace_timing: bool,
    /// Names bound by the host environment.
    #[serde(default)]
    pub external_identifiers: Vec<String>,
}

impl Default for OptimiserSettings {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            steps: default_steps(),
            trace_timing: false,
            external_identifiers: Vec::new(),
        }
    }
}

fn default_dialect() -> DialectKind {
    DialectKind::Typed
}

fn default_steps() -> Vec<OptimiserStep> {
    vec![OptimiserStep::Disambiguate, OptimiserStep::FullInline]
}

impl OptimiserSettings {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: OptimiserSettings = toml::from_str(text)
            .map_err(|err| OptimiserError::Config(format!("invalid settings: {err}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// The inliner needs unique names, so it may only run after the names
    /// were disambiguated.
    pub fn validate(&self) -> Result<()> {
        validate_steps(&self.steps)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect.dialect()
    }

    pub fn external_names(&self) -> impl Iterator<Item = Name> + '_ {
        self.external_identifiers.iter().map(|s| Name::intern(s))
    }
}

pub(crate) fn validate_steps(steps: &[OptimiserStep]) -> Result<()> {
    let first_inline = steps.iter().position(|s| *s == OptimiserStep::FullInline);
    let first_disambiguate = steps.iter().position(|s| *s == OptimiserStep::Disambiguate);
    match (first_inline, first_disambiguate) {
        (Some(inline), Some(disambiguate)) if disambiguate < inline => Ok(()),
        (Some(_), _) => Err(OptimiserError::Config(
            "step `full_inline` requires an earlier `disambiguate` step".to_string(),
        )),
        (None, _) => Ok(()),
    }
}

pub fn read_settings(path: &Path) -> Result<OptimiserSettings> {
    let text = std::fs::read_to_string(path)?;
    OptimiserSettings::from_toml_str(&text).map_err(|err| match err {
        OptimiserError::Config(message) => {
            OptimiserError::Config(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}
