pub mod announcements;
pub mod attendance;
pub mod helpdesk;
pub mod lectures;
pub mod results;
pub mod student;
