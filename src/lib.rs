pub mod cache;
pub mod config;
pub mod covers;
pub mod db;
pub mod models;
pub mod ranking;
pub mod repo;

pub mod routes {
    pub mod books;
    pub mod home;
}
