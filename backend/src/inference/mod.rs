pub mod diagnosis;
pub mod labels;
pub mod model;
pub mod policy;
pub mod preprocess;
