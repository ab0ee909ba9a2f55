pub mod codegen;
pub mod diagram;
pub mod vcd;
