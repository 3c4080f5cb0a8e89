pub mod extract;
pub mod index;
pub mod list;
pub mod time;
