pub mod presence;
pub mod registry;
pub mod hill;
pub mod predictor;
