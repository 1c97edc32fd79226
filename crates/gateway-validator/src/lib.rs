pub mod admission_review;
pub mod codec;
pub mod constants;
pub mod dns;
pub mod engine;
pub mod errors;
pub mod field;
pub mod registry;
pub mod resources;
pub mod validation;

pub use engine::AdmissionEngine;
