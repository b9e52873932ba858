// Hard limits of the compiler and VM

/// Maximum nesting of active Tadpole call frames
pub const MAX_CALL_DEPTH: usize = 256;

/// Arguments per call (there are CALL_0 .. CALL_8)
pub const MAX_ARGS: usize = 8;

/// Operands are one byte wide
pub const MAX_CONSTANTS: usize = 256;
pub const MAX_LOCALS: usize = 256;
pub const MAX_UPVALUES: usize = 256;

/// Initial value stack reservation
pub const BASIC_STACK_SIZE: usize = 256;

/// Pairs nested deeper than this print as `(...)`
pub const MAX_STRINGIFY_DEPTH: usize = 8;

// GC defaults
pub const DEFAULT_GC_THRESHOLD_FLOOR: usize = 1024;
pub const DEFAULT_GC_GROWTH_FACTOR: usize = 2;
pub const DEFAULT_GC_THRESHOLD_ALIGN: usize = 64;
