use std::collections::HashMap;
use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{BodyMeshError, Result};

pub const HEAD_CENTER: &str = "Head Center";
pub const NECK_CENTER: &str = "Neck Center";
pub const SIDE_NECK_LEVEL: &str = "Side Neck level";
pub const WAIST_LEVEL: &str = "Waist level";
pub const PELVIS_CENTER: &str = "Pelvis Center";
pub const LEFT_SHOULDER: &str = "Left Shoulder";
pub const RIGHT_SHOULDER: &str = "Right Shoulder";
pub const LEFT_WRIST: &str = "Left Wrist";
pub const RIGHT_WRIST: &str = "Right Wrist";
pub const LEFT_PELVIS: &str = "Left Pelvis";
pub const RIGHT_PELVIS: &str = "Right Pelvis";
pub const LEFT_ANKLE: &str = "Left Ankle";
pub const RIGHT_ANKLE: &str = "Right Ankle";

/// Named joint positions in the same space as the exported vertices.
///
/// Serialized as a plain JSON object: `{"Left Wrist": [x, y, z], ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointMap {
    joints: HashMap<String, Vec3>,
}

impl JointMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, position: Vec3) {
        self.joints.insert(name.into(), position);
    }

    /// Position of `name`; there is no fallback for absent joints.
    pub fn get(&self, name: &str) -> Result<Vec3> {
        self.joints
            .get(name)
            .copied()
            .ok_or_else(|| BodyMeshError::MissingJoint(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

impl<S: Into<String>> FromIterator<(S, Vec3)> for JointMap {
    fn from_iter<I: IntoIterator<Item = (S, Vec3)>>(iter: I) -> Self {
        Self {
            joints: iter
                .into_iter()
                .map(|(name, pos)| (name.into(), pos))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_json_object() {
        let joints = JointMap::from_json_str(r#"{"Head Center": [0.0, 16.5, 0.25]}"#).unwrap();
        assert_eq!(joints.get(HEAD_CENTER).unwrap(), Vec3::new(0.0, 16.5, 0.25));
        assert_eq!(joints.len(), 1);
    }

    #[test]
    fn json_round_trip() {
        let joints: JointMap = [
            (LEFT_WRIST, Vec3::new(6.0, 8.0, 0.5)),
            (RIGHT_ANKLE, Vec3::new(-1.0, 1.0, -0.25)),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&joints).unwrap();
        assert!(json.contains("\"Left Wrist\":[6.0,8.0,0.5]"));
        assert_eq!(JointMap::from_json_str(&json).unwrap(), joints);
    }

    #[test]
    fn missing_joint_is_reported_by_name() {
        let joints = JointMap::new();
        match joints.get(LEFT_WRIST) {
            Err(BodyMeshError::MissingJoint(name)) => assert_eq!(name, "Left Wrist"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_json_is_an_error() {
        assert!(matches!(
            JointMap::from_json_str("{\"Head Center\": [1, 2]}"),
            Err(BodyMeshError::Json(_))
        ));
    }
}
