pub mod manifest;
pub mod paths;
