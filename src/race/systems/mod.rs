pub mod behavior;
pub mod controller;
pub mod decision;
pub mod manager;
pub mod obstacles;
pub mod path_cache;
pub mod pathfinding;
pub mod perception;
pub mod power_ups;
