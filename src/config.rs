//! Configuration for attribute resolution

/// Configuration options for resolving attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveConfig {
    /// Maximum number of nested resolver calls on one instance
    ///
    /// Only enforced while `detect_cycles` is off.
    pub max_depth: usize,

    /// Reject a resolver that (transitively) asks for its own attribute
    pub detect_cycles: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            detect_cycles: true,
        }
    }
}

impl ResolveConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum resolution depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enable or disable cycle detection
    ///
    /// With detection off a cycle runs until it hits `max_depth`; with it on,
    /// acyclic chains may nest to any depth.
    pub fn with_cycle_detection(mut self, detect: bool) -> Self {
        self.detect_cycles = detect;
        self
    }
}
