// Test module organization
pub mod test_basic;
pub mod test_errors;
pub mod test_gc;
pub mod test_natives;
