use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use geom::LonLat;

use crate::{ApproachDirection, Device, DeviceId, Provenance};

/// The versioned device collection for one work zone. The placement engine creates these
/// tagged `MachineSuggested`; every consumer-side mutation re-tags `UserModified`, and a
/// `UserModified` layout is sticky: regeneration only replaces it on an explicit user
/// action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub version: usize,
    devices: Vec<Device>,
    pub approach: ApproachDirection,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub provenance: Provenance,
}

impl Layout {
    pub fn new(devices: Vec<Device>, approach: ApproachDirection) -> Layout {
        let now = now_ms();
        Layout {
            version: 1,
            devices,
            approach,
            created_at_ms: now,
            updated_at_ms: now,
            provenance: Provenance::MachineSuggested,
        }
    }

    pub fn devices(&self) -> &Vec<Device> {
        &self.devices
    }

    /// Adds a device, assigning it a fresh id. Re-tags the layout `UserModified`.
    pub fn add_device(&mut self, mut device: Device) -> DeviceId {
        device.id = self.next_id();
        let id = device.id;
        self.devices.push(device);
        self.touch();
        id
    }

    /// Moves one device; everything else is untouched. Returns false for an unknown id.
    pub fn move_device(&mut self, id: DeviceId, pos: LonLat) -> bool {
        if let Some(device) = self.devices.iter_mut().find(|d| d.id == id) {
            device.pos = pos;
            self.touch();
            true
        } else {
            false
        }
    }

    pub fn remove_device(&mut self, id: DeviceId) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| d.id != id);
        if self.devices.len() != before {
            self.touch();
            true
        } else {
            false
        }
    }

    pub fn override_approach(&mut self, approach: ApproachDirection) {
        self.approach = approach;
        self.touch();
    }

    /// Applies a freshly regenerated layout over this one. A `UserModified` layout is
    /// never silently overwritten; it survives unless the regeneration was an explicit
    /// user action.
    pub fn merge_regenerated(&self, regenerated: Layout, explicit_user_action: bool) -> Layout {
        if self.provenance == Provenance::UserModified && !explicit_user_action {
            info!("Keeping user-modified layout v{}; regeneration wasn't explicit", self.version);
            return self.clone();
        }
        regenerated
    }

    /// A FeatureCollection of point markers, one per device.
    pub fn to_geojson(&self) -> geojson::GeoJson {
        let mut features = Vec::new();
        for device in &self.devices {
            let mut props = serde_json::Map::new();
            props.insert("id".to_string(), device.id.0.into());
            props.insert("type".to_string(), device.device_type.as_str().into());
            if let Some(face) = device.sign_face {
                props.insert("signFace".to_string(), face.as_str().into());
            }
            if let Some(ref label) = device.label {
                props.insert("label".to_string(), label.clone().into());
            }
            if let Some(rotation) = device.rotation_degs {
                props.insert("rotation".to_string(), rotation.into());
            }
            props.insert("purpose".to_string(), device.meta.purpose.clone().into());
            features.push(geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::Point(
                    device.pos.to_geojson(),
                ))),
                id: None,
                properties: Some(props),
                foreign_members: None,
            });
        }
        geojson::GeoJson::FeatureCollection(geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        })
    }

    fn next_id(&self) -> DeviceId {
        DeviceId(self.devices.iter().map(|d| d.id.0 + 1).max().unwrap_or(0))
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at_ms = now_ms();
        self.provenance = Provenance::UserModified;
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceMeta, DeviceType, PlacementMethod};

    fn cone(id: usize, pos: LonLat) -> Device {
        Device {
            id: DeviceId(id),
            device_type: DeviceType::Cone,
            sign_face: None,
            pos,
            label: None,
            rotation_degs: None,
            meta: DeviceMeta {
                sequence: id,
                purpose: "taper".to_string(),
                method: PlacementMethod::RoadAligned,
                resolved_distance: None,
                approximate: false,
            },
        }
    }

    fn two_cones() -> Layout {
        Layout::new(
            vec![
                cone(0, LonLat::new(-122.34, 47.60)),
                cone(1, LonLat::new(-122.3401, 47.60)),
            ],
            ApproachDirection::East,
        )
    }

    #[test]
    fn edits_retag_and_preserve_everything_else() {
        let mut layout = two_cones();
        assert_eq!(layout.provenance, Provenance::MachineSuggested);

        let moved_to = LonLat::new(-122.3402, 47.6001);
        assert!(layout.move_device(DeviceId(1), moved_to));
        assert_eq!(layout.provenance, Provenance::UserModified);
        assert_eq!(layout.version, 2);
        assert_eq!(layout.devices()[0].pos, LonLat::new(-122.34, 47.60));
        assert_eq!(layout.devices()[1].pos, moved_to);

        assert!(!layout.move_device(DeviceId(99), moved_to));

        let id = layout.add_device(cone(0, moved_to));
        assert_eq!(id, DeviceId(2));
        assert!(layout.remove_device(id));
        assert_eq!(layout.devices().len(), 2);
    }

    #[test]
    fn user_modified_is_sticky() {
        let mut layout = two_cones();
        let regenerated = Layout::new(
            vec![cone(0, LonLat::new(-122.35, 47.61))],
            ApproachDirection::South,
        );

        // Still machine-suggested, so regeneration replaces it freely
        assert_eq!(
            layout.merge_regenerated(regenerated.clone(), false).devices().len(),
            1
        );

        layout.override_approach(ApproachDirection::North);
        assert_eq!(layout.provenance, Provenance::UserModified);

        let kept = layout.merge_regenerated(regenerated.clone(), false);
        assert_eq!(kept.approach, ApproachDirection::North);
        assert_eq!(kept.devices().len(), 2);

        let replaced = layout.merge_regenerated(regenerated, true);
        assert_eq!(replaced.approach, ApproachDirection::South);
    }
}
