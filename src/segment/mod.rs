//! Splits the vertices of an exported body into anatomical regions.
//!
//! Classification runs on the same prepared coordinates the OBJ writer emits
//! (scaled, masked faces filtered, offset added), so indices in the output
//! file address the vertices of the written OBJ.

mod joints;

use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use glam::Vec3;
use log::{debug, info};

use crate::config::{prepare_meshes, ExportConfig};
use crate::core::Mesh;
use crate::error::{BodyMeshError, Result};
use crate::wavefront::write_atomic;

pub use joints::*;

/// Vertices closer than this to the x = 0 plane take part in crotch detection.
pub const SAGITTAL_EPSILON: f32 = 1e-6;
/// Head starts this far below the head center.
pub const HEAD_MARGIN: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyPart {
    Torso,
    Skirt,
    RightLeg,
    LeftLeg,
    RightArm,
    LeftArm,
    RightHand,
    LeftHand,
    RightFoot,
    LeftFoot,
    Head,
    Neck,
}

impl BodyPart {
    /// Block order of the indices file.
    pub const ALL: [BodyPart; 12] = [
        BodyPart::Torso,
        BodyPart::Skirt,
        BodyPart::RightLeg,
        BodyPart::LeftLeg,
        BodyPart::RightArm,
        BodyPart::LeftArm,
        BodyPart::RightHand,
        BodyPart::LeftHand,
        BodyPart::RightFoot,
        BodyPart::LeftFoot,
        BodyPart::Head,
        BodyPart::Neck,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BodyPart::Torso => "Torso",
            BodyPart::Skirt => "Skirt",
            BodyPart::RightLeg => "Right Leg",
            BodyPart::LeftLeg => "Left Leg",
            BodyPart::RightArm => "Right Arm",
            BodyPart::LeftArm => "Left Arm",
            BodyPart::RightHand => "Right Hand",
            BodyPart::LeftHand => "Left Hand",
            BodyPart::RightFoot => "Right Foot",
            BodyPart::LeftFoot => "Left Foot",
            BodyPart::Head => "Head",
            BodyPart::Neck => "Neck",
        }
    }

    pub fn is_leg(self) -> bool {
        matches!(self, BodyPart::RightLeg | BodyPart::LeftLeg)
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl Display for BodyPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Region membership of every vertex.
///
/// `primary` holds the single exclusive region per vertex. Skirt never shows
/// up there; Torso only for vertices that matched nothing but the torso
/// fallback. Leg vertices are additionally listed in the Skirt group, and in
/// the Torso group when above the crotch.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub crotch_height: f32,
    pub primary: Vec<Option<BodyPart>>,
    groups: [Vec<usize>; 12],
}

impl Segmentation {
    pub fn vertex_count(&self) -> usize {
        self.primary.len()
    }

    /// Vertex ids of `part`, ascending.
    pub fn group(&self, part: BodyPart) -> &[usize] {
        &self.groups[part.slot()]
    }

    pub fn contains(&self, part: BodyPart, vertex: usize) -> bool {
        self.group(part).binary_search(&vertex).is_ok()
    }

    pub fn unassigned(&self) -> usize {
        self.primary.iter().filter(|p| p.is_none()).count()
    }

    /// `Part=12`, then per region `Name=`, `Node=` and one vertex id per line.
    pub fn write_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "Part={}", BodyPart::ALL.len())?;
        for part in BodyPart::ALL {
            let group = self.group(part);
            writeln!(out, "Name={}", part.label())?;
            writeln!(out, "Node={}", group.len())?;
            for idx in group {
                writeln!(out, "{}", idx)?;
            }
        }
        Ok(())
    }
}

/// Joint positions and the half-spaces derived from them, resolved up front
/// so a missing joint fails before any vertex is looked at.
#[derive(Debug, Clone)]
struct Landmarks {
    head_center: Vec3,
    neck_center: Vec3,
    side_neck: Vec3,
    waist: Vec3,
    pelvis_center: Vec3,
    r_shoulder: Vec3,
    l_shoulder: Vec3,
    r_wrist: Vec3,
    l_wrist: Vec3,
    r_ankle: Vec3,
    l_ankle: Vec3,

    r_normal: Vec3,
    l_normal: Vec3,
    r_mid: Vec3,
    l_mid: Vec3,
    r_diag_normal: Vec3,
    l_diag_normal: Vec3,
}

impl Landmarks {
    fn resolve(joints: &JointMap) -> Result<Self> {
        let r_shoulder = joints.get(RIGHT_SHOULDER)?;
        let l_shoulder = joints.get(LEFT_SHOULDER)?;
        let r_wrist = joints.get(RIGHT_WRIST)?;
        let l_wrist = joints.get(LEFT_WRIST)?;
        let r_pelvis = joints.get(RIGHT_PELVIS)?;
        let l_pelvis = joints.get(LEFT_PELVIS)?;

        // The diagonal plane holds the shoulder and a z-parallel line through
        // the wrist/pelvis midpoint; it separates hand from arm.
        let r_mid = (r_wrist + r_pelvis) / 2.0;
        let r_diag_normal = (r_mid - Vec3::Z - r_shoulder).cross(r_mid + Vec3::Z - r_shoulder);
        let l_mid = (l_wrist + l_pelvis) / 2.0;
        let l_diag_normal = (l_mid + Vec3::Z - l_shoulder).cross(l_mid - Vec3::Z - l_shoulder);

        Ok(Self {
            head_center: joints.get(HEAD_CENTER)?,
            neck_center: joints.get(NECK_CENTER)?,
            side_neck: joints.get(SIDE_NECK_LEVEL)?,
            waist: joints.get(WAIST_LEVEL)?,
            pelvis_center: joints.get(PELVIS_CENTER)?,
            r_shoulder,
            l_shoulder,
            r_wrist,
            l_wrist,
            r_ankle: joints.get(RIGHT_ANKLE)?,
            l_ankle: joints.get(LEFT_ANKLE)?,
            r_normal: r_wrist - r_shoulder,
            l_normal: l_wrist - l_shoulder,
            r_mid,
            l_mid,
            r_diag_normal,
            l_diag_normal,
        })
    }

    /// First matching region wins; the predicates overlap, so order decides.
    fn classify(&self, v: Vec3, crotch: f32) -> Option<BodyPart> {
        let (x, y) = (v.x, v.y);
        let head_floor = self.head_center.y - HEAD_MARGIN;

        if y >= head_floor && x < self.l_shoulder.x && x > self.r_shoulder.x {
            return Some(BodyPart::Head);
        }
        if y < head_floor && y >= self.neck_center.y {
            return Some(BodyPart::Neck);
        }

        let r_arm_side = self.r_diag_normal.dot(v - self.r_mid) > 0.0;
        let l_arm_side = self.l_diag_normal.dot(v - self.l_mid) > 0.0;
        let past_r_wrist = self.r_normal.dot(v - self.r_wrist) > 0.0;
        let past_l_wrist = self.l_normal.dot(v - self.l_wrist) > 0.0;

        if x < self.r_shoulder.x
            && self.r_normal.dot(v - self.r_shoulder) > 0.0
            && !past_r_wrist
            && r_arm_side
        {
            return Some(BodyPart::RightArm);
        }
        if x > self.l_shoulder.x
            && self.l_normal.dot(v - self.l_shoulder) > 0.0
            && !past_l_wrist
            && l_arm_side
        {
            return Some(BodyPart::LeftArm);
        }
        if r_arm_side && past_r_wrist {
            return Some(BodyPart::RightHand);
        }
        if l_arm_side && past_l_wrist {
            return Some(BodyPart::LeftHand);
        }

        let pelvis_x = self.pelvis_center.x;
        if y <= self.waist.y && y > self.r_ankle.y && x <= pelvis_x {
            return Some(BodyPart::RightLeg);
        }
        if y <= self.waist.y && y > self.l_ankle.y && x >= pelvis_x {
            return Some(BodyPart::LeftLeg);
        }
        if x < pelvis_x && y <= self.r_ankle.y {
            return Some(BodyPart::RightFoot);
        }
        if x > pelvis_x && y <= self.l_ankle.y {
            return Some(BodyPart::LeftFoot);
        }
        if y < self.side_neck.y && y > crotch {
            return Some(BodyPart::Torso);
        }
        None
    }
}

/// Lowest y among the vertices lying on the sagittal plane.
pub fn crotch_height(points: impl IntoIterator<Item = Vec3>) -> Option<f32> {
    points
        .into_iter()
        .filter(|p| p.x.abs() < SAGITTAL_EPSILON)
        .map(|p| p.y)
        .reduce(f32::min)
}

/// Classify already positioned vertices; ids are positions in `points`.
pub fn segment_points(points: &[Vec3], joints: &JointMap) -> Result<Segmentation> {
    let landmarks = Landmarks::resolve(joints)?;
    let crotch = crotch_height(points.iter().copied()).ok_or_else(|| {
        BodyMeshError::Precondition(
            "no vertex on the sagittal plane, cannot find the crotch height".to_string(),
        )
    })?;

    let mut groups: [Vec<usize>; 12] = Default::default();
    let mut primary = Vec::with_capacity(points.len());
    for (idx, &v) in points.iter().enumerate() {
        let part = landmarks.classify(v, crotch);
        if let Some(part) = part {
            groups[part.slot()].push(idx);
            if part.is_leg() {
                groups[BodyPart::Skirt.slot()].push(idx);
                if v.y > crotch {
                    groups[BodyPart::Torso.slot()].push(idx);
                }
            }
        }
        primary.push(part);
    }

    let segmentation = Segmentation {
        crotch_height: crotch,
        primary,
        groups,
    };
    debug!(
        "segmented {} vertices, {} unassigned, crotch at {:.4}",
        segmentation.vertex_count(),
        segmentation.unassigned(),
        crotch
    );
    Ok(segmentation)
}

/// Segment `meshes` exactly as `write_obj` would export them with `config`.
/// Vertex ids run on across meshes in the given order.
pub fn segment(meshes: &[Mesh], joints: &JointMap, config: &ExportConfig) -> Result<Segmentation> {
    let prepared = prepare_meshes(meshes, config)?;
    let offset = config.effective_offset();
    let points: Vec<Vec3> = prepared
        .iter()
        .flat_map(|mesh| mesh.coord.iter().map(move |co| *co + offset))
        .collect();
    segment_points(&points, joints)
}

/// Companion file name for an OBJ: `body.obj` gets `bodyIndices`.
pub fn indices_path(obj_path: &Path) -> PathBuf {
    let stem = obj_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    obj_path.with_file_name(format!("{}Indices", stem))
}

pub fn write_indices(path: impl AsRef<Path>, segmentation: &Segmentation) -> Result<()> {
    let path = path.as_ref();
    let mut out: Vec<u8> = Vec::new();
    segmentation.write_to(&mut out)?;
    write_atomic(path, &out)?;
    info!(
        "wrote {} ({} vertices, crotch height {:.4})",
        path.display(),
        segmentation.vertex_count(),
        segmentation.crotch_height
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;

    fn skeleton() -> JointMap {
        [
            (HEAD_CENTER, Vec3::new(0.0, 16.0, 0.0)),
            (NECK_CENTER, Vec3::new(0.0, 14.5, 0.0)),
            (SIDE_NECK_LEVEL, Vec3::new(0.0, 14.0, 0.0)),
            (RIGHT_SHOULDER, Vec3::new(-2.0, 13.0, 0.0)),
            (LEFT_SHOULDER, Vec3::new(2.0, 13.0, 0.0)),
            (RIGHT_WRIST, Vec3::new(-6.0, 8.0, 0.0)),
            (LEFT_WRIST, Vec3::new(6.0, 8.0, 0.0)),
            (RIGHT_PELVIS, Vec3::new(-1.0, 8.0, 0.0)),
            (LEFT_PELVIS, Vec3::new(1.0, 8.0, 0.0)),
            (PELVIS_CENTER, Vec3::new(0.0, 8.0, 0.0)),
            (WAIST_LEVEL, Vec3::new(0.0, 9.0, 0.0)),
            (RIGHT_ANKLE, Vec3::new(-1.0, 1.0, 0.0)),
            (LEFT_ANKLE, Vec3::new(1.0, 1.0, 0.0)),
        ]
        .into_iter()
        .collect()
    }

    // One probe per region plus a few edge cases, with the expected region
    fn probes() -> Vec<(Vec3, Option<BodyPart>)> {
        vec![
            (Vec3::new(0.0, 16.0, 0.0), Some(BodyPart::Head)),
            (Vec3::new(0.0, 15.0, 0.0), Some(BodyPart::Neck)),
            (Vec3::new(-4.0, 10.5, 0.0), Some(BodyPart::RightArm)),
            (Vec3::new(4.0, 10.5, 0.0), Some(BodyPart::LeftArm)),
            (Vec3::new(-7.0, 6.5, 0.0), Some(BodyPart::RightHand)),
            (Vec3::new(7.0, 6.5, 0.0), Some(BodyPart::LeftHand)),
            (Vec3::new(-0.5, 4.0, 0.0), Some(BodyPart::RightLeg)),
            (Vec3::new(0.5, 4.0, 0.0), Some(BodyPart::LeftLeg)),
            (Vec3::new(-1.0, 0.5, 0.5), Some(BodyPart::RightFoot)),
            (Vec3::new(1.0, 0.5, 0.5), Some(BodyPart::LeftFoot)),
            (Vec3::new(0.5, 11.0, 0.0), Some(BodyPart::Torso)),
            // Lowest midline vertex: sets the crotch, right leg, not torso
            (Vec3::new(0.0, 7.0, 0.0), Some(BodyPart::RightLeg)),
            // Leg vertex above the crotch
            (Vec3::new(-0.5, 8.0, 0.0), Some(BodyPart::RightLeg)),
            // Between torso top and neck
            (Vec3::new(0.0, 14.2, 0.0), None),
        ]
    }

    #[test]
    fn every_probe_lands_in_its_region() {
        let (points, expected): (Vec<Vec3>, Vec<Option<BodyPart>>) = probes().into_iter().unzip();
        let seg = segment_points(&points, &skeleton()).unwrap();
        assert_eq!(seg.crotch_height, 7.0);
        assert_eq!(seg.primary, expected);
        assert_eq!(seg.unassigned(), 1);
    }

    #[test]
    fn leg_vertices_overlay_skirt_and_torso_above_crotch() {
        let (points, _): (Vec<Vec3>, Vec<_>) = probes().into_iter().unzip();
        let seg = segment_points(&points, &skeleton()).unwrap();

        for (idx, part) in seg.primary.iter().enumerate() {
            let is_leg = part.map_or(false, BodyPart::is_leg);
            assert_eq!(seg.contains(BodyPart::Skirt, idx), is_leg);
            if is_leg {
                assert_eq!(
                    seg.contains(BodyPart::Torso, idx),
                    points[idx].y > seg.crotch_height
                );
            }
        }
        // Fallback torso vertex plus the leg vertex at y = 8
        assert_eq!(seg.group(BodyPart::Torso), &[10, 12]);
        assert_eq!(seg.group(BodyPart::Skirt), &[6, 7, 11, 12]);
    }

    #[test]
    fn exclusive_regions_never_share_a_vertex() {
        let (points, _): (Vec<Vec3>, Vec<_>) = probes().into_iter().unzip();
        let seg = segment_points(&points, &skeleton()).unwrap();
        for idx in 0..seg.vertex_count() {
            let hits = BodyPart::ALL
                .iter()
                .filter(|&&p| p != BodyPart::Skirt && p != BodyPart::Torso)
                .filter(|&&p| seg.contains(p, idx))
                .count();
            assert!(hits <= 1, "vertex {idx} in {hits} exclusive regions");
        }
    }

    #[test]
    fn crotch_height_ignores_order() {
        let mut points: Vec<Vec3> = (0..50)
            .map(|i| Vec3::new((i % 3) as f32, i as f32 * 0.5 - 10.0, 0.0))
            .collect();
        let expected = crotch_height(points.iter().copied());
        assert_eq!(expected, Some(-10.0));

        let mut rng = rand::thread_rng();
        for _ in 0..10 {
            points.shuffle(&mut rng);
            assert_eq!(crotch_height(points.iter().copied()), expected);
        }
    }

    #[test]
    fn crotch_height_of_midline_triangle() {
        let mesh = Mesh::from_quads(
            "body",
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 5.0, 0.0),
                Vec3::new(0.0, -5.0, 0.0),
                Vec3::new(3.0, -9.0, 0.0),
            ],
            vec![[0, 1, 2, 0], [1, 2, 3, 1]],
        );
        let seg = segment(&[mesh], &skeleton(), &ExportConfig::default()).unwrap();
        assert_eq!(seg.crotch_height, -5.0);
        assert_eq!(seg.vertex_count(), 4);
    }

    #[test]
    fn offset_and_mesh_order_shift_ids() {
        let first = Mesh::from_quads(
            "a",
            vec![Vec3::new(0.0, 14.0, 0.0), Vec3::new(0.5, 14.0, 0.0), Vec3::new(0.0, 15.0, 0.0)],
            vec![[0, 1, 2, 0]],
        );
        let second = Mesh::from_quads(
            "b",
            vec![Vec3::new(-0.5, 3.0, 0.0), Vec3::new(0.5, 3.0, 0.0), Vec3::new(0.0, 4.0, 0.0)],
            vec![[0, 1, 2, 0]],
        );
        let config = ExportConfig {
            feet_on_ground: true,
            offset: Vec3::new(0.0, 1.0, 0.0),
            ..Default::default()
        };
        let seg = segment(&[first, second], &skeleton(), &config).unwrap();
        // Lifted by one unit: y 15 and 16 reach neck and head
        assert_eq!(seg.primary[0], Some(BodyPart::Neck));
        assert_eq!(seg.primary[2], Some(BodyPart::Head));
        assert_eq!(seg.primary[3], Some(BodyPart::RightLeg));
        assert_eq!(seg.primary[4], Some(BodyPart::LeftLeg));
        assert_eq!(seg.crotch_height, 5.0);
    }

    #[test]
    fn missing_joint_fails_before_classification() {
        let joints: JointMap = [(HEAD_CENTER, Vec3::new(0.0, 16.0, 0.0))].into_iter().collect();
        let err = segment_points(&[Vec3::ZERO], &joints).unwrap_err();
        assert!(matches!(err, BodyMeshError::MissingJoint(_)));
    }

    #[test]
    fn no_midline_vertex_is_a_precondition_error() {
        let err = segment_points(&[Vec3::new(1.0, 0.0, 0.0)], &skeleton()).unwrap_err();
        assert!(matches!(err, BodyMeshError::Precondition(_)));
    }

    #[test]
    fn index_file_layout() {
        let points = [Vec3::new(0.0, 16.0, 0.0), Vec3::new(-0.5, 4.0, 0.0), Vec3::new(0.0, 3.0, 0.0)];
        let seg = segment_points(&points, &skeleton()).unwrap();
        let mut out = Vec::new();
        seg.write_to(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let expected = "\
Part=12
Name=Torso
Node=1
1
Name=Skirt
Node=2
1
2
Name=Right Leg
Node=2
1
2
Name=Left Leg
Node=0
Name=Right Arm
Node=0
Name=Left Arm
Node=0
Name=Right Hand
Node=0
Name=Left Hand
Node=0
Name=Right Foot
Node=0
Name=Left Foot
Node=0
Name=Head
Node=1
0
Name=Neck
Node=0
";
        assert_eq!(text, expected);
    }

    #[test]
    fn indices_path_follows_obj_stem() {
        assert_eq!(
            indices_path(Path::new("out/body.obj")),
            PathBuf::from("out/bodyIndices")
        );
    }
}
