pub mod bbox;
pub mod geometry;
pub mod intersection;
pub mod loader;
pub mod mailbox;
pub mod material;
pub mod ray;
pub mod routine;
pub mod stats;
pub mod transform;
