pub mod credits;
pub mod evidence;
pub mod jobs;
pub mod kits;
pub mod outreach;
pub mod people;
