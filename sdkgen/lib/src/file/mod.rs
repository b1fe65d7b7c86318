pub mod go_file;
pub mod syntax;
