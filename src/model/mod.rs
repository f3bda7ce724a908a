pub mod announcement;
pub mod attendance;
pub mod banner;
pub mod lecture;
pub mod result;
pub mod student;
pub mod user;
