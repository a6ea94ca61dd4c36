//! Grasp candidates and ordered candidate sets.
//!
//! A [`GraspCandidate`] is a gripper pose in the cloud frame plus the model
//! score and gripper envelope. Rotations are validated on construction and on
//! every transform; a non-orthonormal matrix is rejected rather than
//! renormalized. [`GraspSet`] is the ordered collection the pipeline prunes.

pub mod nms;

use crate::trace::{trace_event, trace_span};
use crate::util::math::{check_rotation, flatten_row_major, from_row_major};
use crate::util::{GraspError, GraspResult};
use nalgebra::{Matrix3, Vector3};
use std::cmp::Ordering;

pub use nms::{nms_poses, NmsConfig};

/// Number of floats per row in the GraspNet grasp array layout.
pub const GRASPNET_ROW_LEN: usize = 17;

/// Gripper opening and engagement envelope in meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GripperGeometry {
    /// Distance between the fingers.
    pub width: f32,
    /// Finger thickness along the gripper z axis.
    pub height: f32,
    /// How far the fingers reach past the grasp point along the approach axis.
    pub depth: f32,
}

impl Default for GripperGeometry {
    fn default() -> Self {
        Self {
            width: 0.08,
            height: 0.02,
            depth: 0.02,
        }
    }
}

impl GripperGeometry {
    fn validate(&self) -> GraspResult<()> {
        let all = [self.width, self.height, self.depth];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(GraspError::InvalidInput(
                "gripper geometry must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

/// A proposed gripper pose with its confidence score.
///
/// The rotation columns are the gripper axes expressed in the cloud frame:
/// column 0 is the approach direction, column 1 the closing direction and
/// column 2 the finger height direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraspCandidate {
    translation: Vector3<f32>,
    rotation: Matrix3<f32>,
    score: f32,
    geometry: GripperGeometry,
}

impl GraspCandidate {
    /// Creates a candidate, rejecting non-orthonormal rotations.
    pub fn new(
        translation: Vector3<f32>,
        rotation: Matrix3<f32>,
        score: f32,
        geometry: GripperGeometry,
    ) -> GraspResult<Self> {
        if !score.is_finite() {
            return Err(GraspError::InvalidInput("score must be finite"));
        }
        if translation.iter().any(|v| !v.is_finite()) {
            return Err(GraspError::InvalidInput("translation must be finite"));
        }
        check_rotation(&rotation)?;
        geometry.validate()?;
        Ok(Self {
            translation,
            rotation,
            score,
            geometry,
        })
    }

    /// Decodes one row of the GraspNet array layout.
    ///
    /// Layout: `[score, width, height, depth, rotation(9, row-major),
    /// translation(3), object_id]`. The object id is ignored.
    pub fn from_graspnet_row(row: &[f32; GRASPNET_ROW_LEN]) -> GraspResult<Self> {
        let mut rot = [0.0f32; 9];
        rot.copy_from_slice(&row[4..13]);
        Self::new(
            Vector3::new(row[13], row[14], row[15]),
            from_row_major(&rot),
            row[0],
            GripperGeometry {
                width: row[1],
                height: row[2],
                depth: row[3],
            },
        )
    }

    /// Creates a candidate from a row-major rotation.
    pub fn from_flat(
        translation: [f32; 3],
        rotation: [f32; 9],
        score: f32,
        geometry: GripperGeometry,
    ) -> GraspResult<Self> {
        Self::new(
            Vector3::from(translation),
            from_row_major(&rotation),
            score,
            geometry,
        )
    }

    /// Grasp center in the cloud frame.
    pub fn translation(&self) -> &Vector3<f32> {
        &self.translation
    }

    /// Gripper orientation.
    pub fn rotation(&self) -> &Matrix3<f32> {
        &self.rotation
    }

    /// Model confidence; higher is better.
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Gripper envelope used for collision checks and rendering.
    pub fn geometry(&self) -> GripperGeometry {
        self.geometry
    }

    /// Unit approach direction (rotation column 0).
    pub fn approach_axis(&self) -> Vector3<f32> {
        self.rotation.column(0).into_owned()
    }

    /// Rotation flattened in row-major order.
    pub fn rotation_flat(&self) -> [f32; 9] {
        flatten_row_major(&self.rotation)
    }

    /// Re-expresses the grasp in another frame: `R' = R_f R`, `t' = R_f t + t_f`.
    ///
    /// The frame rotation and the composed rotation are both validated.
    pub fn transformed(
        &self,
        frame_rotation: &Matrix3<f32>,
        frame_translation: &Vector3<f32>,
    ) -> GraspResult<Self> {
        check_rotation(frame_rotation)?;
        Self::new(
            frame_rotation * self.translation + frame_translation,
            frame_rotation * self.rotation,
            self.score,
            self.geometry,
        )
    }
}

/// Ordered collection of grasp candidates.
///
/// Insertion order only matters as the tie-break for score ordering.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraspSet {
    grasps: Vec<GraspCandidate>,
}

impl GraspSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing candidates without reordering.
    pub fn from_vec(grasps: Vec<GraspCandidate>) -> Self {
        Self { grasps }
    }

    /// Decodes a flat buffer of GraspNet rows.
    pub fn from_graspnet_rows(data: &[f32]) -> GraspResult<Self> {
        if data.len() % GRASPNET_ROW_LEN != 0 {
            return Err(GraspError::InvalidInput(
                "grasp array length must be a multiple of 17",
            ));
        }
        let mut grasps = Vec::with_capacity(data.len() / GRASPNET_ROW_LEN);
        for chunk in data.chunks_exact(GRASPNET_ROW_LEN) {
            let mut row = [0.0f32; GRASPNET_ROW_LEN];
            row.copy_from_slice(chunk);
            grasps.push(GraspCandidate::from_graspnet_row(&row)?);
        }
        Ok(Self { grasps })
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.grasps.len()
    }

    /// Returns true when the set holds no candidates.
    pub fn is_empty(&self) -> bool {
        self.grasps.is_empty()
    }

    /// Returns the candidate at `index`.
    pub fn get(&self, index: usize) -> Option<&GraspCandidate> {
        self.grasps.get(index)
    }

    /// Iterates candidates in order.
    pub fn iter(&self) -> std::slice::Iter<'_, GraspCandidate> {
        self.grasps.iter()
    }

    /// Borrows the candidates as a slice.
    pub fn as_slice(&self) -> &[GraspCandidate] {
        &self.grasps
    }

    /// Consumes the set.
    pub fn into_vec(self) -> Vec<GraspCandidate> {
        self.grasps
    }

    /// Appends a single candidate. No de-duplication happens here.
    pub fn add(&mut self, grasp: GraspCandidate) {
        self.grasps.push(grasp);
    }

    /// Appends every candidate of `other`, preserving its order.
    pub fn merge(&mut self, other: GraspSet) {
        self.grasps.extend(other.grasps);
    }

    /// Removes near-duplicates, keeping the best-scoring representative.
    ///
    /// Returns the number of removed candidates. The surviving candidates are
    /// left in descending score order.
    pub fn suppress(&mut self, cfg: &NmsConfig) -> usize {
        let _span = trace_span!("nms", input = self.grasps.len()).entered();
        let before = self.grasps.len();
        self.grasps = nms_poses(&self.grasps, cfg);
        let removed = before - self.grasps.len();
        trace_event!("nms_done", kept = self.grasps.len(), removed = removed);
        removed
    }

    /// Stable sort by descending score. Scores are finite, and `0.0` and
    /// `-0.0` compare equal.
    pub fn sort_by_score(&mut self) {
        self.grasps
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    }

    /// Removes and returns the candidate at `index`.
    ///
    /// Later indices shift down by one; prefer [`GraspSet::drop_flagged`] or
    /// [`GraspSet::retain`] when removing several candidates.
    pub fn remove_at(&mut self, index: usize) -> GraspResult<GraspCandidate> {
        if index >= self.grasps.len() {
            return Err(GraspError::IndexOutOfBounds {
                index,
                len: self.grasps.len(),
            });
        }
        Ok(self.grasps.remove(index))
    }

    /// Rebuilds the set without candidates whose mask entry is `true`.
    ///
    /// Returns the number of dropped candidates.
    pub fn drop_flagged(&mut self, mask: &[bool]) -> GraspResult<usize> {
        if mask.len() != self.grasps.len() {
            return Err(GraspError::InvalidInput(
                "mask length must match candidate count",
            ));
        }
        let before = self.grasps.len();
        self.grasps = std::mem::take(&mut self.grasps)
            .into_iter()
            .zip(mask.iter())
            .filter(|(_, flagged)| !**flagged)
            .map(|(grasp, _)| grasp)
            .collect();
        Ok(before - self.grasps.len())
    }

    /// Rebuilds the set with the candidates matching `keep`.
    ///
    /// Returns the number of dropped candidates.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&GraspCandidate) -> bool,
    {
        let before = self.grasps.len();
        self.grasps = std::mem::take(&mut self.grasps)
            .into_iter()
            .filter(|grasp| keep(grasp))
            .collect();
        before - self.grasps.len()
    }

    /// Returns the first `k` candidates.
    pub fn top(&self, k: usize) -> GraspResult<&[GraspCandidate]> {
        if self.grasps.len() < k {
            return Err(GraspError::InsufficientCandidates {
                required: k,
                available: self.grasps.len(),
            });
        }
        Ok(&self.grasps[..k])
    }
}

impl FromIterator<GraspCandidate> for GraspSet {
    fn from_iter<I: IntoIterator<Item = GraspCandidate>>(iter: I) -> Self {
        Self {
            grasps: iter.into_iter().collect(),
        }
    }
}

impl Extend<GraspCandidate> for GraspSet {
    fn extend<I: IntoIterator<Item = GraspCandidate>>(&mut self, iter: I) {
        self.grasps.extend(iter);
    }
}

impl<'a> IntoIterator for &'a GraspSet {
    type Item = &'a GraspCandidate;
    type IntoIter = std::slice::Iter<'a, GraspCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.grasps.iter()
    }
}

impl IntoIterator for GraspSet {
    type Item = GraspCandidate;
    type IntoIter = std::vec::IntoIter<GraspCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.grasps.into_iter()
    }
}
