//! Hill registry
//!
//! Builds the hill list for a level from its capture point definitions.
//! Broken definitions are skipped and logged; the rest still load.

use hashbrown::HashSet;
use tracing::{info, warn};

use crate::game::constants::level::MAX_HILLS;
use crate::game::geometry::Volume;
use crate::game::level::{CapturePointDef, CylinderAxis, LevelObject, TriggerLookup, TriggerShape};
use crate::game::state::{Hill, HillId};
use crate::util::vec3::Vec3;

/// Reasons a capture point definition is skipped
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("capture point '{name}' references missing object {uid}")]
    MissingObject { name: String, uid: i32 },
    #[error("capture point '{name}' references object {uid} which is not a trigger")]
    NotATrigger { name: String, uid: i32 },
    #[error("capture point '{name}' reuses trigger {uid} already claimed by another hill")]
    DuplicateTrigger { name: String, uid: i32 },
    #[error("capture point '{name}' exceeds the limit of {max} hills")]
    TooManyHills { name: String, max: usize },
}

/// Volume for a trigger as configured by its capture point
pub fn volume_for(object: &LevelObject, shape: TriggerShape, def: &CapturePointDef) -> Volume {
    let center = object.position;
    match (shape, def.cylinder) {
        (TriggerShape::Sphere { radius }, false) => Volume::Sphere { center, radius },
        (TriggerShape::Sphere { radius }, true) => Volume::CylinderFromSphere {
            center,
            radius,
            axis: match def.axis {
                CylinderAxis::World => Vec3::Y,
                CylinderAxis::TriggerUp => object.basis.up,
            },
        },
        (TriggerShape::Box { half_extents }, false) => Volume::Box {
            center,
            basis: object.basis,
            half_extents,
        },
        (TriggerShape::Box { half_extents }, true) => Volume::CylinderFromBox {
            center,
            basis: object.basis,
            half_extents,
        },
    }
}

fn resolve<L: TriggerLookup>(
    def: &CapturePointDef,
    level: &L,
    claimed: &HashSet<i32>,
) -> Result<Volume, RegistryError> {
    let object = level
        .object(def.trigger_uid)
        .ok_or_else(|| RegistryError::MissingObject {
            name: def.name.clone(),
            uid: def.trigger_uid,
        })?;
    let shape = object.trigger.ok_or_else(|| RegistryError::NotATrigger {
        name: def.name.clone(),
        uid: def.trigger_uid,
    })?;
    if claimed.contains(&def.trigger_uid) {
        return Err(RegistryError::DuplicateTrigger {
            name: def.name.clone(),
            uid: def.trigger_uid,
        });
    }
    Ok(volume_for(object, shape, def))
}

/// Build hills for a level, assigning ids 1, 2, ... in definition order
pub fn build_hills<L: TriggerLookup>(defs: &[CapturePointDef], level: &L) -> Vec<Hill> {
    let mut hills: Vec<Hill> = Vec::with_capacity(defs.len().min(MAX_HILLS));
    let mut claimed = HashSet::new();

    for def in defs {
        if hills.len() >= MAX_HILLS {
            warn!(
                "Skipping: {}",
                RegistryError::TooManyHills {
                    name: def.name.clone(),
                    max: MAX_HILLS,
                }
            );
            continue;
        }
        match resolve(def, level, &claimed) {
            Ok(volume) => {
                claimed.insert(def.trigger_uid);
                let id = (hills.len() + 1) as HillId;
                hills.push(Hill::new(id, def.name.clone(), def.trigger_uid, volume, def.initial_owner));
            }
            Err(e) => warn!("Skipping: {}", e),
        }
    }

    info!("Registered {} of {} capture points", hills.len(), defs.len());
    hills
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::Basis;
    use crate::game::level::LevelDefinition;
    use crate::game::state::HillOwner;

    fn def(uid: i32, name: &str) -> CapturePointDef {
        CapturePointDef {
            trigger_uid: uid,
            name: name.to_string(),
            initial_owner: HillOwner::Neutral,
            cylinder: true,
            axis: CylinderAxis::World,
        }
    }

    fn level() -> LevelDefinition {
        LevelDefinition {
            name: "test".to_string(),
            objects: vec![
                LevelObject {
                    uid: 1,
                    position: Vec3::ZERO,
                    basis: Basis::IDENTITY,
                    trigger: Some(TriggerShape::Sphere { radius: 5.0 }),
                },
                LevelObject {
                    uid: 2,
                    position: Vec3::new(20.0, 0.0, 0.0),
                    basis: Basis::from_yaw(1.0),
                    trigger: Some(TriggerShape::Box {
                        half_extents: Vec3::new(4.0, 2.0, 4.0),
                    }),
                },
                LevelObject {
                    uid: 3,
                    position: Vec3::ZERO,
                    basis: Basis::IDENTITY,
                    trigger: None,
                },
            ],
            capture_points: Vec::new(),
        }
    }

    #[test]
    fn test_build_assigns_sequential_ids() {
        let mut owned = def(2, "B");
        owned.initial_owner = HillOwner::Blue;
        let hills = build_hills(&[def(1, "A"), owned], &level());
        assert_eq!(hills.len(), 2);
        assert_eq!(hills[0].id, 1);
        assert_eq!(hills[1].id, 2);
        assert_eq!(hills[1].ownership, HillOwner::Blue);
        assert_eq!(hills[1].trigger_uid, 2);
    }

    #[test]
    fn test_bad_definitions_skipped() {
        let defs = [def(99, "Missing"), def(3, "NotTrigger"), def(1, "A"), def(1, "Dup"), def(2, "B")];
        let hills = build_hills(&defs, &level());
        let names: Vec<_> = hills.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(hills[1].id, 2);
    }

    #[test]
    fn test_resolve_errors() {
        let level = level();
        let mut claimed = HashSet::new();
        assert_eq!(
            resolve(&def(99, "M"), &level, &claimed),
            Err(RegistryError::MissingObject { name: "M".to_string(), uid: 99 })
        );
        assert_eq!(
            resolve(&def(3, "N"), &level, &claimed),
            Err(RegistryError::NotATrigger { name: "N".to_string(), uid: 3 })
        );
        claimed.insert(1);
        assert_eq!(
            resolve(&def(1, "D"), &level, &claimed),
            Err(RegistryError::DuplicateTrigger { name: "D".to_string(), uid: 1 })
        );
    }

    #[test]
    fn test_volume_selection() {
        let level = level();
        let sphere = level.object(1).unwrap();
        let shape = sphere.trigger.unwrap();

        let mut exact = def(1, "A");
        exact.cylinder = false;
        assert!(matches!(volume_for(sphere, shape, &exact), Volume::Sphere { .. }));
        assert!(matches!(
            volume_for(sphere, shape, &def(1, "A")),
            Volume::CylinderFromSphere { axis, .. } if axis == Vec3::Y
        ));

        let boxed = level.object(2).unwrap();
        let shape = boxed.trigger.unwrap();
        assert!(matches!(
            volume_for(boxed, shape, &def(2, "B")),
            Volume::CylinderFromBox { .. }
        ));
    }

    #[test]
    fn test_hill_limit() {
        let mut level = level();
        level.objects.clear();
        let defs: Vec<_> = (0..300)
            .map(|uid| {
                level.objects.push(LevelObject {
                    uid,
                    position: Vec3::ZERO,
                    basis: Basis::IDENTITY,
                    trigger: Some(TriggerShape::Sphere { radius: 1.0 }),
                });
                def(uid, "H")
            })
            .collect();
        let hills = build_hills(&defs, &level);
        assert_eq!(hills.len(), MAX_HILLS);
        assert_eq!(hills.last().unwrap().id, 255);
    }

    #[test]
    fn test_empty_level() {
        assert!(build_hills(&[], &level()).is_empty());
    }
}
