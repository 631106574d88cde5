pub mod notifications;
pub mod people;
pub mod utils;
