//! Kart Rivals AI Library
//!
//! Computer-controlled opponents for a kart racing game: racing-line
//! analysis, a behavior state machine, vehicle control and a manager that
//! keeps the whole field inside a per-frame time budget.
//!
//! The host game owns rendering, physics of the player's kart and input. Each
//! frame it hands a [`race::state::GameState`] and [`race::state::PlayerState`]
//! to [`race::systems::manager::AiManager::update`] and reads the opponents'
//! vehicle state back.

pub mod config;
pub mod race;
pub mod util;
