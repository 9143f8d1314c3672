pub mod managed_process;

pub use managed_process::ManagedProcess;
