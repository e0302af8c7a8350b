use lfsforge_config::ExecMode;
use serde::{Deserialize, Serialize};

/// A single source entry. Order
/// within a recipe's `sources[]` is preserved and defines patch
/// application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Remote {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        mirrors: Vec<String>,
    },
    Git {
        git: String,
        #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
        git_ref: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        depth: Option<u32>,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        submodules: bool,
    },
    /// Legacy inline form: a bare string is a URL with no checksum.
    Inline(String),
}

impl SourceEntry {
    /// True when this entry names a patch rather than an archive.
    pub fn is_patch(&self) -> bool {
        match self.url() {
            Some(url) => url.ends_with(".patch") || url.ends_with(".diff"),
            None => false,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            SourceEntry::Remote { url, .. } => Some(url),
            SourceEntry::Inline(url) => Some(url),
            SourceEntry::Git { .. } => None,
        }
    }

    pub fn checksum(&self) -> Option<&str> {
        match self {
            SourceEntry::Remote { sha256, .. } => sha256.as_deref(),
            _ => None,
        }
    }

    pub fn mirrors(&self) -> &[String] {
        match self {
            SourceEntry::Remote { mirrors, .. } => mirrors,
            _ => &[],
        }
    }
}

/// Phase shell commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install: Option<String>,
    #[serde(default)]
    pub mode: ExecMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_jobs: Option<u32>,
}

/// Optional hook commands. Each value is either a
/// path resolved against the hooks directory, a workspace-relative path,
/// or an inline shell command; the Recipe Store does not distinguish
/// between these forms, only hook invocation does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hooks {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_extract: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_extract: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_patch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_install: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_install: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_strip: Option<String>,
}

/// A recipe document. `name` is the registration
/// key across the fleet; `version` is descriptive metadata carried
/// through to state and packaging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub depends: Vec<String>,
    #[serde(default)]
    pub build: BuildSpec,
    #[serde(default)]
    pub environment: Vec<String>,
    #[serde(default)]
    pub hooks: Hooks,
    /// `None` means "use the global config default".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip: Option<bool>,
    /// Free-text metadata, inert to the pipeline; surfaced by `lfsforge
    /// recipe show`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

impl Recipe {
    /// Parsed `KEY=VALUE` environment entries; malformed entries (no
    /// `=`) are skipped rather than failing the whole recipe.
    pub fn environment_pairs(&self) -> Vec<(String, String)> {
        self.environment
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}
