//! Scene point clouds.
//!
//! A cloud is captured once per inference cycle and then only read: the
//! feasibility filter tests grasps against it and the selector renders it.

use crate::util::{GraspError, GraspResult};
use nalgebra::Point3;
use rand::seq::index;
use rand::Rng;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Points with optional per-point RGB colors in `[0, 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    points: Vec<Point3<f32>>,
    colors: Option<Vec<[f32; 3]>>,
}

impl PointCloud {
    /// Creates an uncolored cloud.
    pub fn new(points: Vec<Point3<f32>>) -> Self {
        Self {
            points,
            colors: None,
        }
    }

    /// Creates a colored cloud; both buffers must be the same length.
    pub fn with_colors(points: Vec<Point3<f32>>, colors: Vec<[f32; 3]>) -> GraspResult<Self> {
        if points.len() != colors.len() {
            return Err(GraspError::InvalidInput(
                "color count must match point count",
            ));
        }
        Ok(Self {
            points,
            colors: Some(colors),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point3<f32>] {
        &self.points
    }

    pub fn colors(&self) -> Option<&[[f32; 3]]> {
        self.colors.as_deref()
    }

    /// Voxel-grid downsampling: one centroid per occupied voxel.
    ///
    /// Voxels are emitted in lexicographic index order so the result is
    /// deterministic. Colors are averaged alongside positions. A non-positive
    /// `voxel_size` returns a copy.
    pub fn voxel_downsample(&self, voxel_size: f32) -> Self {
        if self.points.is_empty() || voxel_size <= 0.0 {
            return self.clone();
        }

        let mut voxels: BTreeMap<(i64, i64, i64), ([f32; 3], [f32; 3], usize)> = BTreeMap::new();
        for (i, p) in self.points.iter().enumerate() {
            let key = (
                (p.x / voxel_size).floor() as i64,
                (p.y / voxel_size).floor() as i64,
                (p.z / voxel_size).floor() as i64,
            );
            let entry = voxels.entry(key).or_insert(([0.0; 3], [0.0; 3], 0));
            entry.0[0] += p.x;
            entry.0[1] += p.y;
            entry.0[2] += p.z;
            if let Some(colors) = &self.colors {
                for c in 0..3 {
                    entry.1[c] += colors[i][c];
                }
            }
            entry.2 += 1;
        }

        let mut points = Vec::with_capacity(voxels.len());
        let mut colors = Vec::with_capacity(voxels.len());
        for (sum, color_sum, count) in voxels.into_values() {
            let n = count as f32;
            points.push(Point3::new(sum[0] / n, sum[1] / n, sum[2] / n));
            colors.push([color_sum[0] / n, color_sum[1] / n, color_sum[2] / n]);
        }

        Self {
            points,
            colors: self.colors.as_ref().map(|_| colors),
        }
    }

    /// Draws exactly `num_point` points for model input.
    ///
    /// With enough points the indices are drawn without replacement; otherwise
    /// every point is kept once and the remainder is filled with random repeats.
    pub fn sample<R: Rng + ?Sized>(&self, num_point: usize, rng: &mut R) -> GraspResult<Self> {
        if self.points.is_empty() {
            return Err(GraspError::InvalidInput("cannot sample an empty cloud"));
        }
        if num_point == 0 {
            return Err(GraspError::InvalidInput("num_point must be at least 1"));
        }

        let len = self.points.len();
        let indices: Vec<usize> = if len >= num_point {
            index::sample(rng, len, num_point).into_vec()
        } else {
            let mut all: Vec<usize> = (0..len).collect();
            all.extend((len..num_point).map(|_| rng.random_range(0..len)));
            all
        };

        let points = indices.iter().map(|&i| self.points[i]).collect();
        let colors = self
            .colors
            .as_ref()
            .map(|c| indices.iter().map(|&i| c[i]).collect());
        Ok(Self { points, colors })
    }

    /// Loads a whitespace-separated XYZ file.
    ///
    /// Each line holds `x y z` optionally followed by `r g b` in `0..=255`.
    /// Blank lines and lines starting with `#` are skipped. Colors are kept
    /// only when every point carries them.
    pub fn load_xyz<P: AsRef<Path>>(path: P) -> GraspResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut points = Vec::new();
        let mut colors = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(GraspError::MalformedRecord {
                    line: idx + 1,
                    reason: "expected at least 3 coordinates".to_string(),
                });
            }
            let mut xyz = [0.0f32; 3];
            for (slot, text) in xyz.iter_mut().zip(parts.iter()) {
                *slot = text.parse().map_err(|_| GraspError::MalformedRecord {
                    line: idx + 1,
                    reason: format!("invalid coordinate {text:?}"),
                })?;
            }
            points.push(Point3::new(xyz[0], xyz[1], xyz[2]));

            if parts.len() >= 6 {
                if let (Ok(r), Ok(g), Ok(b)) = (
                    parts[3].parse::<u8>(),
                    parts[4].parse::<u8>(),
                    parts[5].parse::<u8>(),
                ) {
                    colors.push([r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]);
                }
            }
        }

        if !colors.is_empty() && colors.len() == points.len() {
            Self::with_colors(points, colors)
        } else {
            Ok(Self::new(points))
        }
    }
}
