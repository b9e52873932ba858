use crate::gc::GcConfig;
use crate::vm::vm_limits::MAX_CALL_DEPTH;

/// VM construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VmOption {
    /// Calls nested deeper than this fail with a stack overflow
    pub max_call_depth: usize,
    pub gc: GcConfig,
}

impl Default for VmOption {
    fn default() -> Self {
        VmOption {
            max_call_depth: MAX_CALL_DEPTH,
            gc: GcConfig::default(),
        }
    }
}

impl VmOption {
    /// Collect on every allocation. Slow; for shaking out rooting bugs.
    pub fn stress() -> Self {
        VmOption {
            gc: GcConfig {
                stress: true,
                ..GcConfig::default()
            },
            ..VmOption::default()
        }
    }
}
