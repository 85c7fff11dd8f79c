pub mod duty;
pub mod employee;
pub mod leave;
