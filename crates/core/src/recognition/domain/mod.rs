pub mod face_encoder;
pub mod reference_store;
