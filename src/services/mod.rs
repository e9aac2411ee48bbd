pub mod auth_service;
pub mod training_service;
pub mod user_service;

pub use auth_service::AuthService;
pub use training_service::TrainingService;
pub use user_service::UserService;
