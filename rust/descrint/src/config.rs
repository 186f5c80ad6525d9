//! Engine configuration loaded from YAML and `DESCRINT_` environment variables.

use figment::providers::{Env, Format, Yaml};
use serde::{Deserialize, Serialize};

use crate::backend::{Backend, CacheBudget, MicroTile};
use crate::error::EngineError;
use crate::mxn::MacroPolicy;

const DEFAULT_CONFIG_PATH: &str = "./descrint_config.yaml";
const ENV_PREFIX: &str = "DESCRINT_";

/// # Description
/// Tuning knobs of a bound engine. Every field is optional; the default
/// config runs the probed backend under the automatic policy.
/// ## Description of parameters
/// - backend: Force a backend instead of the capability probe result.
/// - policy: `auto`, `direct` or `unpack`.
/// - cache: Override the L1/L2/L3 budgets, in bytes, of the backend.
/// - tile: Override the micro tile of the unpack kernel.
/// # Notes
/// Environment variables are prefixed with DESCRINT_, nested fields are
/// separated by a double underscore. For example, DESCRINT_CACHE__L2=131072.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub backend: Option<Backend>,
    #[serde(default)]
    pub policy: MacroPolicy,
    #[serde(default)]
    pub cache: Option<CacheBudget>,
    #[serde(default)]
    pub tile: Option<MicroTile>,
}

impl EngineConfig {
    /// Load the config from `./descrint_config.yaml` if present, with
    /// DESCRINT_ environment variables taking precedence.
    pub fn load() -> Result<Self, EngineError> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from_path(path: &str) -> Result<Self, EngineError> {
        // Figment doesn't split nested keys on underscores, so map "__" to ".".
        let mut f = figment::Figment::from(
            Env::prefixed(ENV_PREFIX).map(|k| k.as_str().replace("__", ".").into()),
        );
        if std::path::Path::new(path).exists() {
            f = figment::Figment::from(Yaml::file(path)).merge(f);
        }
        Ok(f.extract()?)
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_| {
            let config = EngineConfig::load().unwrap();
            assert_eq!(config, EngineConfig::default());
            assert_eq!(config.policy, MacroPolicy::Auto);
            Ok(())
        });
    }

    #[test]
    fn test_load_yaml() {
        Jail::expect_with(|jail| {
            let _ = jail.create_file(
                "descrint_config.yaml",
                r#"
                backend: sse41
                policy: unpack
                cache:
                    l2: 65536
                tile:
                    m: 3
                    n: 4
                "#,
            );
            let config = EngineConfig::load().unwrap();
            assert_eq!(config.backend, Some(Backend::Sse41));
            assert_eq!(config.policy, MacroPolicy::Unpack);
            assert_eq!(
                config.cache,
                Some(CacheBudget {
                    l2: 65536,
                    ..CacheBudget::default()
                })
            );
            assert_eq!(config.tile, Some(MicroTile::new(3, 4)));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_yaml() {
        Jail::expect_with(|jail| {
            let _ = jail.create_file(
                "random_path.yaml",
                r#"
                backend: avx2
                policy: unpack
                "#,
            );
            jail.set_env("DESCRINT_POLICY", "direct");
            jail.set_env("DESCRINT_CACHE__L1", "1024");
            let config = EngineConfig::load_from_path("random_path.yaml").unwrap();
            assert_eq!(config.backend, Some(Backend::Avx2));
            assert_eq!(config.policy, MacroPolicy::Direct);
            assert_eq!(config.cache.map(|c| c.l1), Some(1024));
            assert_eq!(config.cache.map(|c| c.l3), Some(2 * 1024 * 1024));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        Jail::expect_with(|jail| {
            jail.set_env("DESCRINT_BACKEND", "neon");
            let err = EngineConfig::load().unwrap_err();
            assert!(matches!(err, EngineError::Config(_)));
            Ok(())
        });
    }
}
