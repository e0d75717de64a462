pub mod app_config;
pub mod booking_repo;
pub mod customer_repo;
pub mod database;
pub mod redis_repo;

pub use booking_repo::StoreBookingRepository;
pub use customer_repo::{StoreCustomerRepository, StoreWishlistRepository};
pub use database::DbClient;
pub use redis_repo::RedisClient;
