pub mod evaluation;
pub mod people;
pub mod projects;

pub use evaluation::*;
pub use people::*;
pub use projects::*;
