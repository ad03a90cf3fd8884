pub mod constants;
pub mod geometry;
pub mod level;
pub mod state;
pub mod systems;
pub mod match_result;
