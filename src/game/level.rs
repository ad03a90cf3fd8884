//! Level-authored capture point definitions
//!
//! A level supplies trigger objects and capture point definitions that
//! reference them by uid. Geometry beyond trigger placement is not modelled.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::game::geometry::Basis;
use crate::game::state::HillOwner;
use crate::util::vec3::Vec3;

/// Errors loading a level definition file
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("Failed to read level file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse level definition: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Trigger shape as authored
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TriggerShape {
    Sphere { radius: f32 },
    Box { half_extents: Vec3 },
}

/// Placed level object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelObject {
    pub uid: i32,
    pub position: Vec3,
    #[serde(default)]
    pub basis: Basis,
    /// `None` for anything that is not a trigger
    #[serde(default)]
    pub trigger: Option<TriggerShape>,
}

/// Axis used when a sphere trigger is approximated as a cylinder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CylinderAxis {
    #[default]
    World,
    TriggerUp,
}

fn default_cylinder() -> bool {
    true
}

/// Capture point as authored in the level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturePointDef {
    pub trigger_uid: i32,
    pub name: String,
    #[serde(default)]
    pub initial_owner: HillOwner,
    /// Approximate the trigger as an upright cylinder
    #[serde(default = "default_cylinder")]
    pub cylinder: bool,
    #[serde(default)]
    pub axis: CylinderAxis,
}

/// Lookup of level objects by uid
pub trait TriggerLookup {
    fn object(&self, uid: i32) -> Option<&LevelObject>;
}

/// Level content relevant to KOTH
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<LevelObject>,
    #[serde(default)]
    pub capture_points: Vec<CapturePointDef>,
}

impl LevelDefinition {
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Built-in three-hill level used when no level file is configured
    pub fn demo() -> Self {
        let objects = vec![
            LevelObject {
                uid: 100,
                position: Vec3::new(-40.0, 0.0, 0.0),
                basis: Basis::IDENTITY,
                trigger: Some(TriggerShape::Sphere { radius: 8.0 }),
            },
            LevelObject {
                uid: 101,
                position: Vec3::new(0.0, 4.0, 0.0),
                basis: Basis::from_yaw(0.5),
                trigger: Some(TriggerShape::Box {
                    half_extents: Vec3::new(10.0, 4.0, 6.0),
                }),
            },
            LevelObject {
                uid: 102,
                position: Vec3::new(40.0, 0.0, 0.0),
                basis: Basis::IDENTITY,
                trigger: Some(TriggerShape::Sphere { radius: 8.0 }),
            },
        ];
        let capture_points = vec![
            CapturePointDef {
                trigger_uid: 100,
                name: "West Ridge".to_string(),
                initial_owner: HillOwner::Red,
                cylinder: true,
                axis: CylinderAxis::World,
            },
            CapturePointDef {
                trigger_uid: 101,
                name: "Bridge".to_string(),
                initial_owner: HillOwner::Neutral,
                cylinder: true,
                axis: CylinderAxis::World,
            },
            CapturePointDef {
                trigger_uid: 102,
                name: "East Ridge".to_string(),
                initial_owner: HillOwner::Blue,
                cylinder: false,
                axis: CylinderAxis::World,
            },
        ];
        Self {
            name: "demo".to_string(),
            objects,
            capture_points,
        }
    }
}

impl TriggerLookup for LevelDefinition {
    fn object(&self, uid: i32) -> Option<&LevelObject> {
        self.objects.iter().find(|o| o.uid == uid)
    }
}
