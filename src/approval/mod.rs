pub mod resolver;
pub mod transition;
