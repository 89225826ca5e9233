pub mod chat;
pub mod core;
pub mod drive;
pub mod janitors;
pub mod main_module;
pub mod security;
pub mod stakwork;
pub mod tasks;
pub mod workspaces;
