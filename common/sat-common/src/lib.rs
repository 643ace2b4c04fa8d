pub mod arrayvec;
pub mod boxedarray;
pub mod debug;
pub mod frontend;
pub mod input;
pub mod macros;
pub mod num;
pub mod rom;
