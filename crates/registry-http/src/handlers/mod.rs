pub mod health;
pub mod import;
pub mod repositories;
pub mod repository_paths;
pub mod tags;
