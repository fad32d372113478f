/// Track geometry constants
pub mod track {
    /// Segment count of the synthetic fallback track
    pub const DEFAULT_SEGMENTS: usize = 32;
    /// Radius of the synthetic fallback track
    pub const DEFAULT_RADIUS: f32 = 200.0;
    /// Driveable width used when a track does not specify one
    pub const DEFAULT_WIDTH: f32 = 30.0;
    /// Minimum waypoint count for a usable cyclic track
    pub const MIN_WAYPOINTS: usize = 3;
}

/// Racing line and path query constants
pub mod pathfinding {
    /// |curvature| above this marks a corner
    pub const CORNER_CURVATURE_THRESHOLD: f32 = 0.1;
    /// Corner difficulty = |curvature| * this
    pub const CORNER_DIFFICULTY_SCALE: f32 = 10.0;
    /// Top speed assigned to straight line-points
    pub const LINE_TOP_SPEED: f32 = 100.0;
    /// Lateral grip used for corner speed: v = sqrt(radius * grip)
    pub const CORNER_GRIP: f32 = 120.0;
    /// Floor for corner line-point speed
    pub const MIN_CORNER_SPEED: f32 = 20.0;
    /// Number of sectors the lap is split into
    pub const SECTOR_COUNT: usize = 3;
    /// Weight of the centre point when smoothing the racing line
    pub const SMOOTHING_CENTER_WEIGHT: f32 = 0.5;

    /// Grid size used to quantize path cache keys (world units)
    pub const CACHE_QUANTUM: f32 = 10.0;
    /// Path cache entry lifetime
    pub const CACHE_TTL_MS: u64 = 1000;
    /// Expired entries are pruned once the cache holds this many paths
    pub const CACHE_PRUNE_THRESHOLD: usize = 256;

    /// Nearest line-point lookups beyond this distance are treated as misses
    pub const NEAREST_MAX_DISTANCE: f32 = 250.0;
    /// Default clearance kept from obstacles when avoiding them
    pub const DEFAULT_AVOIDANCE_DISTANCE: f32 = 10.0;

    /// Aggressive corner speed scale
    pub const AGGRESSIVE_CORNER_SPEED: f32 = 0.95;
    /// Aggressive straight speed scale
    pub const AGGRESSIVE_STRAIGHT_SPEED: f32 = 1.05;
    /// Fraction of half-width the aggressive line moves toward the inside on corners
    pub const AGGRESSIVE_CORNER_SHIFT: f32 = 0.5;
    /// Fraction of half-width the aggressive line moves toward the inside on straights
    pub const AGGRESSIVE_STRAIGHT_SHIFT: f32 = 0.3;
    /// Defensive speed scale
    pub const DEFENSIVE_SPEED: f32 = 0.9;
    /// Player closer than this to a path point counts as threatening
    pub const DEFENSIVE_THREAT_DISTANCE: f32 = 50.0;
    /// Fraction of the player's lateral offset the defensive line moves over
    pub const DEFENSIVE_BLOCK_FACTOR: f32 = 0.5;
    /// Safe corner speed scale
    pub const SAFE_CORNER_SPEED: f32 = 0.85;
    /// Fraction of half-width the safe line moves toward the outside on corners
    pub const SAFE_CORNER_SHIFT: f32 = 0.4;

    /// Overtaking needs more width than this
    pub const OVERTAKE_MIN_WIDTH: f32 = 20.0;
    /// Overtaking is refused in corners tighter than this radius
    pub const OVERTAKE_MIN_CORNER_RADIUS: f32 = 30.0;
}

/// Obstacle tracking constants
pub mod obstacles {
    /// Dynamic obstacles older than this are purged
    pub const DYNAMIC_TTL_MS: u64 = 1000;
    /// Default lifetime for temporary obstacles
    pub const TEMPORARY_LIFETIME_MS: u64 = 5000;
    /// Collision radius used for racers
    pub const RACER_RADIUS: f32 = 2.5;
    /// Collision radius used for power-up pickups
    pub const POWER_UP_RADIUS: f32 = 2.0;
}

/// Behavior state machine constants
pub mod behavior {
    /// Distance at which proximity to the player reaches zero
    pub const PROXIMITY_RANGE: f32 = 100.0;
    /// Aggressiveness needed to start an overtake
    pub const OVERTAKE_AGGRESSION: f32 = 0.4;
    /// State timer limits (seconds)
    pub const OVERTAKE_MAX_TIME: f32 = 3.0;
    pub const DEFEND_MAX_TIME: f32 = 2.0;
    pub const POWER_UP_MAX_TIME: f32 = 1.0;
    pub const RECOVER_MAX_TIME: f32 = 2.0;
    pub const DRAFT_MAX_TIME: f32 = 5.0;
    /// Proximity below which defending stops
    pub const DEFEND_MIN_PROXIMITY: f32 = 0.5;
    /// Proximity below which drafting stops
    pub const DRAFT_MIN_PROXIMITY: f32 = 0.6;
    /// Proximity above which the player is considered engaged
    pub const INTERACTION_PROXIMITY: f32 = 0.3;

    /// Target speed multipliers by state
    pub const OVERTAKE_SPEED_SCALE: f32 = 1.1;
    pub const CORNER_SPEED_SCALE: f32 = 0.8;
    pub const RECOVER_SPEED_SCALE: f32 = 0.6;

    /// Corners tighter than this radius trigger braking
    pub const TIGHT_CORNER_RADIUS: f32 = 15.0;
    /// Steering bias applied while passing
    pub const OVERTAKE_STEER_BIAS: f32 = 0.3;
    /// Steering bias applied away from an obstacle while recovering
    pub const RECOVER_STEER_BIAS: f32 = 0.5;

    /// Race position above which aggression gets a boost
    pub const AGGRESSION_BOOST_POSITION: u32 = 4;
    pub const AGGRESSION_BOOST: f32 = 0.2;
    /// Risk tolerance for risk-taking and cautious drivers
    pub const HIGH_RISK_TOLERANCE: f32 = 0.8;
    pub const LOW_RISK_TOLERANCE: f32 = 0.4;

    /// Strategic focus tiers by race position
    pub const MAINTAIN_LEAD_MAX_POSITION: u32 = 3;
    pub const ADVANCE_POSITION_MAX_POSITION: u32 = 6;

    /// Minimum seconds between two mistakes
    pub const MISTAKE_COOLDOWN: f32 = 5.0;
    /// Mistake effect duration range (seconds)
    pub const MISTAKE_MIN_DURATION: f32 = 1.0;
    pub const MISTAKE_MAX_DURATION: f32 = 3.0;
    /// Magnitude of the oversteer steering error
    pub const OVERSTEER_ERROR: f32 = 0.3;
    /// Brake response delay injected by a late-braking mistake (seconds)
    pub const BRAKE_LATE_DELAY: f32 = 0.4;

    /// Aggressiveness adaptation step per tick
    pub const ADAPTATION_STEP: f32 = 0.01;
    /// Smoothing for the observed player aggressiveness estimate
    pub const PLAYER_ESTIMATE_SMOOTHING: f32 = 0.05;
    /// Dead zone around the estimate where aggressiveness is left alone
    pub const ADAPTATION_DEAD_ZONE: f32 = 0.005;
}

/// Per-tick perception constants
pub mod perception {
    /// Base look-ahead distance for waypoint queries
    pub const WAYPOINT_LOOK_AHEAD: f32 = 20.0;
    /// How far ahead obstacles are considered "ahead"
    pub const OBSTACLE_LOOK_AHEAD: f32 = 30.0;
    /// Forward cone (cosine) for "ahead" checks
    pub const AHEAD_CONE_COS: f32 = 0.7;
    /// Racer ahead closer than this offers an overtaking opportunity
    pub const OVERTAKE_RANGE: f32 = 25.0;
    /// Steering angle (radians) mapped to full lock
    pub const FULL_LOCK_ANGLE: f32 = std::f32::consts::FRAC_PI_4;
}

/// Controller and vehicle physics constants
pub mod controller {
    /// Difference beyond which throttle/brake engage
    pub const SPEED_DEAD_BAND: f32 = 5.0;
    /// Speed deficit that maps to full throttle
    pub const THROTTLE_RANGE: f32 = 50.0;
    /// Speed surplus that maps to full brake
    pub const BRAKE_RANGE: f32 = 30.0;
    /// Throttle held inside the dead band
    pub const CRUISE_THROTTLE: f32 = 0.3;
    /// Brake applied when a decision requests braking
    pub const DECISION_BRAKE: f32 = 0.6;
    /// Per-tick steering smoothing factor
    pub const STEERING_SMOOTHING: f32 = 0.2;
    /// Weight of the path-following steer when a non-optimal line is followed
    pub const PATH_STEER_WEIGHT: f32 = 0.5;

    /// Threat detection radius
    pub const DETECTION_RADIUS: f32 = 25.0;
    /// Nearest threat closer than this triggers a full stop
    pub const EMERGENCY_BRAKE_DISTANCE: f32 = 15.0;
    /// Threats colliding later than this are ignored (seconds)
    pub const MAX_TIME_TO_COLLISION: f32 = 2.0;
    /// Floor for ttc in the severity formula
    pub const MIN_SEVERITY_TTC: f32 = 0.1;
    /// Steering change per second when dodging
    pub const AVOIDANCE_STRENGTH: f32 = 5.0;

    /// Drift charge rate per second
    pub const DRIFT_CHARGE_RATE: f32 = 0.5;
    /// Maximum drift charge
    pub const DRIFT_MAX_CHARGE: f32 = 3.0;
    /// Minimum speed to build drift charge
    pub const DRIFT_SPEED_THRESHOLD: f32 = 20.0;
    /// Mini-turbo multiplier by floor(charge)
    pub const DRIFT_BOOST_TABLE: [f32; 4] = [1.0, 1.2, 1.4, 1.6];
    /// Mini-turbo duration after a drift release (seconds)
    pub const MINI_TURBO_DURATION: f32 = 1.0;
    /// Turn rate bonus while drifting
    pub const DRIFT_TURN_BONUS: f32 = 1.3;

    /// Slipstream range behind another racer
    pub const SLIPSTREAM_RANGE: f32 = 30.0;
    /// Alignment (cosine) required to be "directly behind"
    pub const SLIPSTREAM_ALIGNMENT: f32 = 0.95;
    pub const SLIPSTREAM_MULTIPLIER: f32 = 1.1;
    /// Slipstream multiplier decay per second
    pub const SLIPSTREAM_DECAY: f32 = 1.0;

    /// Engine force at full throttle (units/s^2)
    pub const ENGINE_FORCE: f32 = 60.0;
    /// Brake force at full brake (units/s^2)
    pub const BRAKE_FORCE: f32 = 90.0;
    /// Maximum reverse speed
    pub const MAX_REVERSE_SPEED: f32 = 10.0;
    /// Top speed allowance over the difficulty's max speed, before boosts
    pub const TOP_SPEED_HEADROOM: f32 = 1.1;
    /// Heading change at full lock and top speed (rad/s)
    pub const TURN_RATE: f32 = 2.5;
    /// Rolling friction, applied as speed *= FRICTION each tick
    pub const FRICTION: f32 = 0.998;
    /// Air resistance, applied as speed *= 1 - AIR_RESISTANCE * |speed| * dt
    pub const AIR_RESISTANCE: f32 = 0.0005;
}

/// Power-up constants
pub mod power_ups {
    /// Pickups closer than this are collected
    pub const COLLECT_RADIUS: f32 = 8.0;
    /// Items an opponent can hold
    pub const INVENTORY_CAPACITY: usize = 2;
    /// Time between two activations (seconds)
    pub const ACTIVATION_COOLDOWN: f32 = 1.0;

    pub const SPEED_BOOST_MULTIPLIER: f32 = 2.0;
    pub const SPEED_BOOST_DURATION: f32 = 3.0;
    pub const INVINCIBILITY_DURATION: f32 = 5.0;
    pub const TURBO_MULTIPLIER: f32 = 1.5;
    pub const TURBO_DURATION: f32 = 4.0;

    /// A racer within this range ahead makes a strategic boost worthwhile
    pub const STRATEGIC_TARGET_RANGE: f32 = 40.0;
    /// Speed below this fraction of target makes a strategic boost worthwhile
    pub const STRATEGIC_SPEED_FRACTION: f32 = 0.9;
    /// A racer behind within this range counts as a threat for defensive use
    pub const DEFENSIVE_THREAT_RANGE: f32 = 20.0;
}

/// Roster management constants
pub mod manager {
    /// Hard cap on spawned opponents
    pub const MAX_OPPONENTS: usize = 7;
    /// Opponents that receive full processing per frame
    pub const MAX_ACTIVE: usize = 4;
    /// Opponents farther than this from the player are never fully processed
    pub const CULLING_DISTANCE: f32 = 1000.0;
    /// Probability a spawned opponent keeps the base difficulty
    pub const BASE_DIFFICULTY_SHARE: f64 = 0.6;
    /// Probability a spawned opponent is one level easier
    pub const EASIER_DIFFICULTY_SHARE: f64 = 0.2;
    /// Share of rubberband strength applied to opponents behind the player
    pub const BEHIND_RUBBERBAND_SHARE: f32 = 0.5;
    /// Lap fraction behind the start line that counts as the starting grid
    pub const GRID_ZONE_SHARE: f32 = 0.1;
    /// Grid spacing along the line and across it
    pub const GRID_ROW_SPACING: f32 = 8.0;
    pub const GRID_LANE_OFFSET: f32 = 4.0;
    /// AI time budget per frame (milliseconds)
    pub const FRAME_BUDGET_MS: f32 = 2.0;
}

/// Steering angle to steering command in [-1, 1]
#[inline]
pub fn angle_to_steering(angle: f32) -> f32 {
    (angle / perception::FULL_LOCK_ANGLE).clamp(-1.0, 1.0)
}
