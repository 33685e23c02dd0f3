pub mod reward_repository;
pub mod stock_repository;
pub mod user_repository;

// Re-export all repositories for convenient access
pub use reward_repository::RewardRepository;
pub use stock_repository::StockRepository;
pub use user_repository::UserRepository;
