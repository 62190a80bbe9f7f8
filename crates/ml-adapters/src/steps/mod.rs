//! Runners de job por kind. Cada runner recibe los inputs ya resueltos
//! (ubicaciones concretas) y el config opaco del step, y devuelve las
//! ubicaciones de todos los outputs que produjo.

pub mod process;
pub mod train;
pub mod transform;

pub use process::run_process_job;
pub use train::run_train_job;
pub use transform::run_transform_job;
