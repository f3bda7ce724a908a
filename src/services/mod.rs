pub mod announcements;
pub mod banners;
pub mod helpdesk;
pub mod history;
pub mod lectures;
pub mod profile;
pub mod results;
