pub mod labels;
pub mod relations;
