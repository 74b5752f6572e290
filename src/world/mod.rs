use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// An entity the agent can target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub position: Vec3,
}

/// A block in the world. `is_air` and `is_liquid` gate dig/place validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub position: Vec3,
    pub is_air: bool,
    pub is_liquid: bool,
}

/// An inventory item stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventoryInfo {
    pub used_slots: u32,
    pub total_slots: u32,
}

impl InventoryInfo {
    pub fn free_slots(&self) -> u32 {
        self.total_slots.saturating_sub(self.used_slots)
    }

    pub fn is_full(&self) -> bool {
        self.used_slots >= self.total_slots
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VitalStats {
    pub health: f64,
    pub food: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub light_level: f64,
    pub time_of_day: f64,
}

/// One-shot snapshot of agent telemetry, gathered from the capability port
/// once per script run and handed to the execution context as plain data.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub health: f64,
    pub food: f64,
    pub position: Vec3,
    pub health_low: bool,
    pub hunger_low: bool,
    pub needs_food: bool,
    pub inventory_used: u32,
    pub inventory_free: u32,
    pub inventory_full: bool,
    pub light_level: f64,
    pub time_of_day: f64,
}

impl TelemetrySnapshot {
    /// Assemble a snapshot from the port's telemetry getters.
    pub fn gather(port: &dyn CapabilityPort) -> Self {
        let vitals = port.get_vital_stats();
        let environment = port.get_environment_info();
        let inventory = port.get_inventory_info();
        Self {
            health: vitals.health,
            food: vitals.food,
            position: port.get_position(),
            health_low: port.is_health_low(),
            hunger_low: port.is_hunger_low(),
            needs_food: port.needs_to_eat(),
            inventory_used: inventory.used_slots,
            inventory_free: inventory.free_slots(),
            inventory_full: inventory.is_full(),
            light_level: environment.light_level,
            time_of_day: environment.time_of_day,
        }
    }
}

/// Failures reported by the world behind the port.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorldError {
    #[error("{0}")]
    ActionFailed(String),

    #[error("no path to ({0:.1}, {1:.1}, {2:.1})")]
    Unreachable(f64, f64, f64),
}

/// Boundary the interpreter uses to affect the world and read agent state.
///
/// The real game client implements this; tests inject a scripted fake so the
/// interpreter runs without any live connection. World-affecting calls are
/// async suspension points; finders and telemetry getters are synchronous
/// reads of already-known state.
#[async_trait]
pub trait CapabilityPort: Send + Sync {
    /// Chat output. Fire-and-forget; history is owned by the collaborator.
    fn send_message(&self, text: &str);

    fn get_position(&self) -> Vec3;

    /// Walk to the target. May fail or take arbitrarily long; the
    /// interpreter wraps this in a hard timeout.
    async fn goto(&self, x: f64, y: f64, z: f64) -> Result<(), WorldError>;

    fn find_nearest_entity(&self, name: &str) -> Option<Entity>;

    /// `None` query means "whatever block the agent is currently targeting".
    fn find_nearest_block(&self, query: Option<&str>) -> Option<Block>;

    fn find_item(&self, name: &str) -> Option<Item>;

    fn find_best_tool(&self, block: &Block) -> Option<Item>;

    fn get_inventory_info(&self) -> InventoryInfo;

    async fn attack(&self, entity: &Entity) -> Result<(), WorldError>;

    async fn dig(&self, block: &Block) -> Result<(), WorldError>;

    async fn place_block(&self, item: &Item, at: Vec3) -> Result<(), WorldError>;

    async fn equip(&self, item: &Item) -> Result<(), WorldError>;

    async fn toss(&self, item: &Item, count: u32) -> Result<(), WorldError>;

    fn get_vital_stats(&self) -> VitalStats;

    fn needs_to_eat(&self) -> bool;

    fn is_health_low(&self) -> bool;

    fn is_hunger_low(&self) -> bool;

    fn get_environment_info(&self) -> EnvironmentInfo;
}
