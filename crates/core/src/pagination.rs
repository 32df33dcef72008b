//! List parameters and limit clamping shared by the store and repositories.

use serde::Deserialize;

use crate::config::ModelConfig;

/// Clamp a user-provided limit to `[1, max]`, falling back to `default`.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Query parameters for listing children of a parent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    /// Include DISABLED rows (soft-deleted) in the result.
    #[serde(default)]
    pub include_disabled: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListParams {
    pub fn all() -> Self {
        Self {
            include_disabled: true,
            ..Self::default()
        }
    }

    /// Resolve to a concrete `(limit, offset)` pair.
    pub fn window(&self, config: &ModelConfig) -> (i64, i64) {
        (
            clamp_limit(self.limit, config.default_page_size, config.max_page_size),
            clamp_offset(self.offset),
        )
    }
}

/// Apply a `(limit, offset)` window to an already ordered iterator.
pub fn paginate<T, I>(items: I, limit: i64, offset: i64) -> Vec<T>
where
    I: IntoIterator<Item = T>,
{
    // Both values are clamped non-negative before they get here.
    items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(clamp_limit(None, 20, 100), 20);
        assert_eq!(clamp_limit(Some(0), 20, 100), 1);
        assert_eq!(clamp_limit(Some(500), 20, 100), 100);
    }

    #[test]
    fn negative_offset_clamped() {
        assert_eq!(clamp_offset(Some(-3)), 0);
        assert_eq!(clamp_offset(None), 0);
    }

    #[test]
    fn window_uses_config() {
        let config = ModelConfig {
            default_page_size: 2,
            max_page_size: 3,
            sort_order_step: 10,
        };
        let params = ListParams::default();
        assert_eq!(params.window(&config), (2, 0));
        let params = ListParams {
            limit: Some(50),
            offset: Some(4),
            ..ListParams::default()
        };
        assert_eq!(params.window(&config), (3, 4));
    }

    #[test]
    fn paginate_skips_and_takes() {
        let page = paginate(1..=10, 3, 2);
        assert_eq!(page, vec![3, 4, 5]);
        assert!(paginate(1..=3, 5, 10).is_empty());
    }
}
