pub mod boolean;
pub mod creation;
pub mod decompose;
pub mod shaping;
