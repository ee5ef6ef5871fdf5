pub mod achievements;
pub mod projects;
pub mod tasks;
pub mod transfer;
