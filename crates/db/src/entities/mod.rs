pub mod board;
pub mod column;
pub mod task;
pub mod workspace;
