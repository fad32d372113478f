pub mod constants;
pub mod performance;
pub mod state;
pub mod systems;
pub mod track;
