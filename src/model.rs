pub mod bounds;
pub mod cloud;
pub mod labels;
pub mod options;
pub mod vector3;
