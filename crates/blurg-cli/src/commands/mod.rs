pub mod common;
pub mod connect;
pub mod demote;
pub mod diaries;
pub mod feed;
pub mod key;
pub mod log;
pub mod ls;
pub mod promote;
pub mod rm;
pub mod switch;
pub mod wipe;
