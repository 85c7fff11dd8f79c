pub mod balance_repo;
pub use balance_repo::BalanceRepository;
pub mod duty_repo;
pub use duty_repo::DutyRepository;
pub mod employee_repo;
pub use employee_repo::EmployeeRepository;
pub mod leave_repo;
pub use leave_repo::LeaveRepository;
pub mod pg_store;
pub use pg_store::PgStore;

#[cfg(test)]
pub mod memory;
#[cfg(test)]
pub use memory::MemoryStore;
