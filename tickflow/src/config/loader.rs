//! Locating, parsing and resolving node configuration documents.

use super::overrides::{apply_overrides, ConfigOverrides};
use super::NodeConfig;
use crate::errors::PipelineError;
use crate::identifier::NodeIdentifier;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the configs folder under each search root.
pub const CONFIGS_DIR: &str = "configs";
/// Extension of node configuration documents.
pub const CONFIG_EXTENSION: &str = "yml";

/// How documents are laid out under a search root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayout {
    /// `<base>/configs/<namespace>/<name>.yml`
    Namespaced,
    /// `<base>/configs/<name>.yml`
    Flat,
}

/// Reads node configuration documents from one search root.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_dir: PathBuf,
    layout: ConfigLayout,
}

impl ConfigLoader {
    /// Creates a loader for the built-in search root.
    #[must_use]
    pub fn builtin(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            layout: ConfigLayout::Namespaced,
        }
    }

    /// Creates a loader for an external (custom nodes) search root.
    #[must_use]
    pub fn external(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            layout: ConfigLayout::Flat,
        }
    }

    /// Returns the base directory injected as `root`.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns where the document for `identifier` lives.
    #[must_use]
    pub fn config_path(&self, identifier: &NodeIdentifier) -> PathBuf {
        let file = format!("{}.{CONFIG_EXTENSION}", identifier.name());
        let configs = self.base_dir.join(CONFIGS_DIR);
        match self.layout {
            ConfigLayout::Namespaced => configs.join(identifier.namespace()).join(file),
            ConfigLayout::Flat => configs.join(file),
        }
    }

    /// Loads the document for `identifier`, applying overrides in order.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound`, `ConfigParse` or `Io`.
    pub fn load(
        &self,
        identifier: &NodeIdentifier,
        overrides: &[&serde_json::Map<String, serde_json::Value>],
    ) -> Result<NodeConfig, PipelineError> {
        let path = self.config_path(identifier);
        let mut values = read_document(identifier, &path)?;

        let node = identifier.to_string();
        for update in overrides {
            apply_overrides(&mut values, update, &node);
        }

        debug!(node = %node, path = %path.display(), "Loaded node config");
        Ok(NodeConfig::new(identifier.clone(), values, &self.base_dir))
    }
}

fn read_document(
    identifier: &NodeIdentifier,
    path: &Path,
) -> Result<serde_json::Map<String, serde_json::Value>, PipelineError> {
    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PipelineError::ConfigNotFound {
            identifier: identifier.to_string(),
            path: path.to_path_buf(),
        },
        _ => PipelineError::io(path, e),
    })?;

    let parse_error = |message: String| PipelineError::ConfigParse {
        identifier: identifier.to_string(),
        path: path.to_path_buf(),
        message,
    };

    let document: serde_json::Value =
        serde_yaml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?;

    match document {
        serde_json::Value::Object(values) => Ok(values),
        serde_json::Value::Null => Ok(serde_json::Map::new()),
        other => Err(parse_error(format!("expected a mapping at the top level, got {other}"))),
    }
}

/// Resolves configuration for any node identifier.
///
/// Built-in namespaces read from the built-in root; `custom.*` reads from the
/// custom nodes directory.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    builtin: ConfigLoader,
    external: ConfigLoader,
    overrides: ConfigOverrides,
}

impl ConfigResolver {
    /// Creates a resolver over the two search roots.
    #[must_use]
    pub fn new(builtin_root: impl Into<PathBuf>, custom_dir: impl Into<PathBuf>) -> Self {
        Self {
            builtin: ConfigLoader::builtin(builtin_root),
            external: ConfigLoader::external(custom_dir),
            overrides: ConfigOverrides::default(),
        }
    }

    /// Sets global user overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Returns the loader responsible for `identifier`.
    #[must_use]
    pub fn loader_for(&self, identifier: &NodeIdentifier) -> &ConfigLoader {
        if identifier.is_custom() {
            &self.external
        } else {
            &self.builtin
        }
    }

    /// Resolves the configuration for `identifier`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound`, `ConfigParse` or `Io`.
    pub fn resolve(&self, identifier: &NodeIdentifier) -> Result<NodeConfig, PipelineError> {
        self.resolve_with(identifier, None)
    }

    /// Resolves configuration, applying `extra` after the global overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigNotFound`, `ConfigParse` or `Io`.
    pub fn resolve_with(
        &self,
        identifier: &NodeIdentifier,
        extra: Option<&serde_json::Map<String, serde_json::Value>>,
    ) -> Result<NodeConfig, PipelineError> {
        let layers: Vec<_> = self.overrides.get(identifier).into_iter().chain(extra).collect();
        self.loader_for(identifier).load(identifier, &layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn id(s: &str) -> NodeIdentifier {
        NodeIdentifier::parse(s).unwrap()
    }

    #[test]
    fn test_config_paths() {
        let builtin = ConfigLoader::builtin("/pkg");
        let external = ConfigLoader::external("/proj/custom_nodes");

        assert_eq!(
            builtin.config_path(&id("dabble.fps")),
            PathBuf::from("/pkg/configs/dabble/fps.yml")
        );
        assert_eq!(
            external.config_path(&id("custom.counter")),
            PathBuf::from("/proj/custom_nodes/configs/counter.yml")
        );
    }

    #[test]
    fn test_load_injects_root() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "configs/dabble/fps.yml", "input: [\"none\"]\noutput: [\"fps\"]\nwindow: 10\n");

        let cfg = ConfigLoader::builtin(tmp.path()).load(&id("dabble.fps"), &[]).unwrap();

        assert_eq!(cfg.get("window"), Some(&json!(10)));
        assert_eq!(cfg.root(), tmp.path());
        assert_eq!(cfg.get("root"), Some(&json!(tmp.path().to_string_lossy())));
    }

    #[test]
    fn test_missing_document() {
        let tmp = TempDir::new().unwrap();
        let err = ConfigLoader::builtin(tmp.path())
            .load(&id("model.nothing"), &[])
            .unwrap_err();

        assert!(matches!(err, PipelineError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_malformed_document() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "configs/dabble/bad.yml", "input: [unclosed\n");
        write(tmp.path(), "configs/dabble/list.yml", "- a\n- b\n");

        let loader = ConfigLoader::builtin(tmp.path());
        assert!(matches!(
            loader.load(&id("dabble.bad"), &[]).unwrap_err(),
            PipelineError::ConfigParse { .. }
        ));
        assert!(matches!(
            loader.load(&id("dabble.list"), &[]).unwrap_err(),
            PipelineError::ConfigParse { .. }
        ));
    }

    #[test]
    fn test_empty_document_is_empty_mapping() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "configs/dabble/empty.yml", "");

        let cfg = ConfigLoader::builtin(tmp.path()).load(&id("dabble.empty"), &[]).unwrap();
        assert_eq!(cfg.values().len(), 1);
    }

    #[test]
    fn test_resolver_routes_custom_nodes() {
        let pkg = TempDir::new().unwrap();
        let custom = TempDir::new().unwrap();
        write(pkg.path(), "configs/dabble/fps.yml", "window: 10\n");
        write(custom.path(), "configs/counter.yml", "step: 1\n");

        let resolver = ConfigResolver::new(pkg.path(), custom.path());

        let builtin = resolver.resolve(&id("dabble.fps")).unwrap();
        assert_eq!(builtin.root(), pkg.path());

        let external = resolver.resolve(&id("custom.counter")).unwrap();
        assert_eq!(external.root(), custom.path());
        assert_eq!(external.get("step"), Some(&json!(1)));
    }

    #[test]
    fn test_resolver_applies_overrides_in_order() {
        let pkg = TempDir::new().unwrap();
        write(pkg.path(), "configs/dabble/fps.yml", "window: 10\nprecision: 2\n");

        let fps = id("dabble.fps");
        let global = ConfigOverrides::new().with_node(
            &fps,
            json!({"window": 3, "precision": 1}).as_object().unwrap().clone(),
        );
        let resolver = ConfigResolver::new(pkg.path(), "/unused").with_overrides(global);

        let extra = json!({"window": 7}).as_object().unwrap().clone();
        let cfg = resolver.resolve_with(&fps, Some(&extra)).unwrap();

        assert_eq!(cfg.get("window"), Some(&json!(7)));
        assert_eq!(cfg.get("precision"), Some(&json!(1)));
    }
}
