//! Modelo de threads, filas de escalonamento e pipeline de sinais.

pub mod config;
pub mod scheduler;
pub mod signal;
pub mod task;

#[cfg(feature = "self_test")]
pub mod test;

pub use scheduler::{
    create_thread, current_cwd, current_id, exit_current, init, kill, reap_zombies, schedule,
    with_current, with_task,
};
pub use task::{Task, TaskId, TaskState};
