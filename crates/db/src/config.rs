use docbase_core::error::CoreError;

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub database_url: String,
    /// Pool size (default: `20`).
    pub max_connections: u32,
}

impl DbConfig {
    /// | Env Var                    | Default    |
    /// |----------------------------|------------|
    /// | `DATABASE_URL`             | (required) |
    /// | `DATABASE_MAX_CONNECTIONS` | `20`       |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CoreError::Validation("DATABASE_URL must be set".into()))?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            None => 20,
            Some(raw) => raw.trim().parse().map_err(|_| {
                CoreError::Validation(format!(
                    "DATABASE_MAX_CONNECTIONS must be a positive integer, got '{raw}'"
                ))
            })?,
        };
        if max_connections == 0 {
            return Err(CoreError::Validation(
                "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
            ));
        }

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}
