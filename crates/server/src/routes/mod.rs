pub mod boards;
pub mod columns;
pub mod health;
pub mod tasks;
pub mod workspaces;
