pub mod build;
pub mod files;
pub mod project;
pub mod settings;
pub mod watch;
