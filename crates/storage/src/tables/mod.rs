pub mod ssz_encoder;
pub mod table;
pub mod validators;
