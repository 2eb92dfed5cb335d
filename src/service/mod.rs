// service/mod.rs
pub mod auth;
pub mod gallery;

pub use auth::UserContext;
pub use gallery::GalleryService;
