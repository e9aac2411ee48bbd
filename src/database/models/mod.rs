pub mod course;
pub mod role;
pub mod token;
pub mod training_need;
pub mod user;

pub use course::{Course, CourseDelivery};
pub use role::{Permission, Role};
pub use token::{EmailVerificationToken, RefreshToken};
pub use training_need::{NeedPriority, NeedStatus, TrainingNeed};
pub use user::{User, UserSummary, USER_COLUMNS, USER_SUMMARY_COLUMNS};
