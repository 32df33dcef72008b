use crate::error::CoreError;

/// Tunables for listing and ordering.
///
/// All fields have defaults suitable for local development; override via
/// environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Page size used when a list request does not name one (default: `20`).
    pub default_page_size: i64,
    /// Upper bound on any page size (default: `100`).
    pub max_page_size: i64,
    /// Gap between auto-assigned `sort_order` values (default: `10`).
    pub sort_order_step: i32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            sort_order_step: 10,
        }
    }
}

impl ModelConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default |
    /// |-----------------------------|---------|
    /// | `DOCBASE_DEFAULT_PAGE_SIZE` | `20`    |
    /// | `DOCBASE_MAX_PAGE_SIZE`     | `100`   |
    /// | `DOCBASE_SORT_ORDER_STEP`   | `10`    |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            default_page_size: parse_var(
                &lookup,
                "DOCBASE_DEFAULT_PAGE_SIZE",
                defaults.default_page_size,
            )?,
            max_page_size: parse_var(&lookup, "DOCBASE_MAX_PAGE_SIZE", defaults.max_page_size)?,
            sort_order_step: parse_var(
                &lookup,
                "DOCBASE_SORT_ORDER_STEP",
                defaults.sort_order_step,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_page_size < 1 {
            return Err(CoreError::Validation(
                "max_page_size must be at least 1".into(),
            ));
        }
        if self.default_page_size < 1 || self.default_page_size > self.max_page_size {
            return Err(CoreError::Validation(format!(
                "default_page_size must be between 1 and {}",
                self.max_page_size
            )));
        }
        if self.sort_order_step < 1 {
            return Err(CoreError::Validation(
                "sort_order_step must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CoreError::Validation(format!("{key} must be an integer, got '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ModelConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ModelConfig::default());
    }

    #[test]
    fn overrides_applied() {
        let config = ModelConfig::from_lookup(lookup(&[
            ("DOCBASE_DEFAULT_PAGE_SIZE", "5"),
            ("DOCBASE_SORT_ORDER_STEP", " 100 "),
        ]))
        .unwrap();
        assert_eq!(config.default_page_size, 5);
        assert_eq!(config.max_page_size, 100);
        assert_eq!(config.sort_order_step, 100);
    }

    #[test]
    fn malformed_value_rejected() {
        assert!(ModelConfig::from_lookup(lookup(&[("DOCBASE_MAX_PAGE_SIZE", "lots")])).is_err());
    }

    #[test]
    fn default_above_max_rejected() {
        let result = ModelConfig::from_lookup(lookup(&[
            ("DOCBASE_DEFAULT_PAGE_SIZE", "50"),
            ("DOCBASE_MAX_PAGE_SIZE", "10"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn zero_step_rejected() {
        assert!(ModelConfig::from_lookup(lookup(&[("DOCBASE_SORT_ORDER_STEP", "0")])).is_err());
    }
}
