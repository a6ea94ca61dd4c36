//! Render surface contract and scoped surface ownership.

use crate::cloud::PointCloud;
use crate::grasp::GraspCandidate;
use crate::select::palette::Tag;
use crate::util::GraspResult;
use std::ops::{Deref, DerefMut};

/// Geometry handed to the rendering backend.
///
/// The backend builds meshes itself; the core only says what to draw.
#[derive(Clone, Copy, Debug)]
pub enum Shape<'a> {
    /// A gripper at the candidate pose, drawn in the tag color.
    Gripper {
        grasp: &'a GraspCandidate,
        tag: Tag,
    },
    /// The scene cloud.
    Cloud(&'a PointCloud),
}

/// Minimal windowing/rendering backend used by the selector.
pub trait RenderSurface {
    /// Opens the surface with the given width in pixels.
    fn create_surface(&mut self, width: u32) -> GraspResult<()>;
    /// Adds geometry to the open surface.
    fn add_geometry(&mut self, shape: Shape<'_>) -> GraspResult<()>;
    /// Processes pending events; returns `false` once the surface is closed.
    fn poll_events(&mut self) -> bool;
    /// Orbits the view camera.
    fn orbit(&mut self, dx: f32, dy: f32);
    /// Redraws the surface.
    fn refresh(&mut self);
    /// Releases the surface. Must tolerate being called after a close.
    fn destroy_surface(&mut self);
}

/// Owns an open surface and destroys it on drop, including on early return.
pub struct SurfaceGuard<'s, S: RenderSurface + ?Sized> {
    surface: &'s mut S,
}

impl<'s, S: RenderSurface + ?Sized> SurfaceGuard<'s, S> {
    /// Creates the surface. Nothing is destroyed if creation fails.
    pub fn open(surface: &'s mut S, width: u32) -> GraspResult<Self> {
        surface.create_surface(width)?;
        Ok(Self { surface })
    }
}

impl<S: RenderSurface + ?Sized> Deref for SurfaceGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> DerefMut for SurfaceGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: RenderSurface + ?Sized> Drop for SurfaceGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.destroy_surface();
    }
}
