//! Fault-tolerance configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{DuplicatePolicy, FtError, FtResult, KindSet};

/// Upper bound for [`FtConfig::max_nesting_depth`].
pub const MAX_NESTING_DEPTH: u32 = 8;

/// Pre-reboot hooks that can be registered.
pub const MAX_PRE_REBOOT_HOOKS: usize = 4;

/// Runtime configuration of a [`FaultTolerance`](crate::FaultTolerance)
/// instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FtConfig {
    /// Handler invocations one context may have active at once. A report
    /// beyond this depth schedules a reboot instead of dispatching.
    pub max_nesting_depth: u32,
    /// Behaviour when a kind is registered twice.
    pub duplicate_policy: DuplicatePolicy,
    /// Keep a ring of recently handled faults.
    pub record_history: bool,
    /// Include context payload dumps in log records.
    pub dump_context: bool,
    /// Kinds with detection enabled after `init`.
    pub initially_enabled: KindSet,
}

impl FtConfig {
    /// Defaults: depth 3, last registration wins, history and context dumps
    /// on, every kind disabled.
    pub const DEFAULT: FtConfig = FtConfig {
        max_nesting_depth: 3,
        duplicate_policy: DuplicatePolicy::Replace,
        record_history: true,
        dump_context: true,
        initially_enabled: KindSet::EMPTY,
    };

    /// No nesting and no silent handler replacement.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            max_nesting_depth: 1,
            duplicate_policy: DuplicatePolicy::Reject,
            ..Self::DEFAULT
        }
    }

    /// Every kind enabled and the deepest nesting allowed.
    #[must_use]
    pub const fn permissive() -> Self {
        Self {
            max_nesting_depth: MAX_NESTING_DEPTH,
            initially_enabled: KindSet::ALL,
            ..Self::DEFAULT
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FtError::InvalidConfiguration`] if `max_nesting_depth` is
    /// zero or above [`MAX_NESTING_DEPTH`].
    pub const fn validate(&self) -> FtResult<()> {
        if self.max_nesting_depth == 0 {
            return Err(FtError::invalid_configuration(
                "max_nesting_depth must be greater than 0",
            ));
        }
        if self.max_nesting_depth > MAX_NESTING_DEPTH {
            return Err(FtError::invalid_configuration(
                "max_nesting_depth exceeds MAX_NESTING_DEPTH",
            ));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub const fn builder() -> FtConfigBuilder {
        FtConfigBuilder {
            config: Self::DEFAULT,
        }
    }
}

impl Default for FtConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Builder for [`FtConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FtConfigBuilder {
    config: FtConfig,
}

impl FtConfigBuilder {
    /// Set the per-context nesting bound.
    #[must_use]
    pub const fn max_nesting_depth(mut self, depth: u32) -> Self {
        self.config.max_nesting_depth = depth;
        self
    }

    /// Set the duplicate registration policy.
    #[must_use]
    pub const fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicate_policy = policy;
        self
    }

    /// Enable or disable the fault history.
    #[must_use]
    pub const fn record_history(mut self, enabled: bool) -> Self {
        self.config.record_history = enabled;
        self
    }

    /// Enable or disable context dumps in logs.
    #[must_use]
    pub const fn dump_context(mut self, enabled: bool) -> Self {
        self.config.dump_context = enabled;
        self
    }

    /// Set the kinds enabled after `init`.
    #[must_use]
    pub const fn initially_enabled(mut self, kinds: KindSet) -> Self {
        self.config.initially_enabled = kinds;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub const fn build(self) -> FtResult<FtConfig> {
        match self.config.validate() {
            Ok(()) => Ok(self.config),
            Err(e) => Err(e),
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::FaultKind;

    #[test]
    fn test_default_config_is_valid() -> FtResult<()> {
        FtConfig::default().validate()?;
        FtConfig::strict().validate()?;
        FtConfig::permissive().validate()?;
        assert_eq!(FtConfig::default().max_nesting_depth, 3);
        assert!(FtConfig::default().initially_enabled.is_empty());
        Ok(())
    }

    #[test]
    fn test_config_builder() -> FtResult<()> {
        let config = FtConfig::builder()
            .max_nesting_depth(2)
            .duplicate_policy(DuplicatePolicy::Reject)
            .record_history(false)
            .dump_context(false)
            .initially_enabled(KindSet::only(FaultKind::HardFault))
            .build()?;

        assert_eq!(config.max_nesting_depth, 2);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert!(!config.record_history);
        assert!(!config.dump_context);
        assert!(config.initially_enabled.contains(FaultKind::HardFault));
        Ok(())
    }

    #[test]
    fn test_config_validation() {
        let config = FtConfig {
            max_nesting_depth: 0,
            ..FtConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FtError::InvalidConfiguration(_))
        ));

        let built = FtConfig::builder()
            .max_nesting_depth(MAX_NESTING_DEPTH + 1)
            .build();
        assert!(matches!(built, Err(FtError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_presets() {
        assert_eq!(FtConfig::strict().duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(FtConfig::strict().max_nesting_depth, 1);
        assert_eq!(FtConfig::permissive().initially_enabled, KindSet::ALL);
    }
}
