//! Configuration for the method analysis pipeline.

/// Tuning knobs for path enumeration and stack simulation.
///
/// # Examples
///
/// ```rust
/// use cilflow::analysis::AnalysisConfig;
///
/// let config = AnalysisConfig::default()
///     .with_revisit_limit(3)
///     .with_parallel(true);
/// assert_eq!(config.revisit_limit, 3);
/// assert!(config.model_finally);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// How often a run may already appear on a path for the path to be extended into it once
    /// more (default: 2). This bound is what makes enumeration terminate on loops.
    pub revisit_limit: usize,

    /// Simulate enumerated paths concurrently (default: false).
    pub parallel: bool,

    /// Insert the `finally` handler into paths that branch out of a protected region
    /// (default: true).
    pub model_finally: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            revisit_limit: 2,
            parallel: false,
            model_finally: true,
        }
    }
}

impl AnalysisConfig {
    /// Sets the revisit bound used by the path enumerator.
    #[must_use]
    pub fn with_revisit_limit(mut self, limit: usize) -> Self {
        self.revisit_limit = limit;
        self
    }

    /// Enables or disables parallel path simulation.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enables or disables the `finally` insertion.
    #[must_use]
    pub fn with_model_finally(mut self, model_finally: bool) -> Self {
        self.model_finally = model_finally;
        self
    }
}
