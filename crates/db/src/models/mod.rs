pub mod board;
pub mod column;
pub mod ids;
pub mod patch;
pub mod task;
pub(crate) mod validate;
pub mod workspace;
