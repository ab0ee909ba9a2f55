pub mod logic;
pub mod typed_value;

// Re-export all public types
pub use logic::{Logic, VcdBit};
pub use typed_value::{Value, ValueType};
