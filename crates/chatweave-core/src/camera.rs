//! Camera module for pan/zoom transforms.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Lowest zoom level the canvas allows.
pub const MIN_ZOOM: f64 = 0.5;
/// Highest zoom level the canvas allows.
pub const MAX_ZOOM: f64 = 2.0;
/// Wheel delta to zoom delta conversion. Negative so that scrolling
/// up (negative wheel delta) zooms in.
pub const WHEEL_ZOOM_SCALE: f64 = -0.001;

/// Safety factor applied when fitting content, leaving a margin around it.
const FIT_SAFETY: f64 = 0.9;
/// Fitting never zooms in past 100%, only out.
const FIT_MAX_ZOOM: f64 = 1.0;

/// Camera manages the view transform for the canvas.
///
/// It handles panning (translation) and zooming (scaling) operations,
/// converting between screen coordinates and world coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Current world-to-screen translation offset (pan).
    pub pan: Vec2,
    /// Current zoom level (1.0 = 100%).
    pub zoom: f64,
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the affine transform for rendering.
    ///
    /// This transform converts world coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    /// Get the inverse transform for input handling.
    ///
    /// This transform converts screen coordinates to world coordinates.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.pan)
    }

    /// Convert a screen point to world coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    /// Convert a world point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Set the zoom level, clamping to the allowed range.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Apply a wheel scroll delta to the zoom level.
    ///
    /// The zoom anchor is the canvas origin, not the pointer position.
    pub fn wheel_zoom(&mut self, delta_y: f64) {
        self.set_zoom(self.zoom + delta_y * WHEEL_ZOOM_SCALE);
    }

    /// Reset camera to default position and zoom.
    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0;
    }

    /// Fit the camera so the given world-space bounds are centered in the
    /// viewport.
    ///
    /// Picks the smaller of the per-axis viewport/content ratios, scaled
    /// down by a safety margin and capped at 100%. Degenerate bounds are a
    /// no-op; callers special-case the empty node set.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size) {
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return;
        }

        let scale_x = viewport.width / bounds.width();
        let scale_y = viewport.height / bounds.height();
        let fitted = (scale_x.min(scale_y) * FIT_SAFETY).min(FIT_MAX_ZOOM);
        self.zoom = fitted.clamp(self.min_zoom, self.max_zoom);

        let bounds_center = bounds.center();
        let viewport_center = Point::new(viewport.width / 2.0, viewport.height / 2.0);
        self.pan = Vec2::new(
            viewport_center.x - bounds_center.x * self.zoom,
            viewport_center.y - bounds_center.y * self.zoom,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_camera() {
        let camera = Camera::new();
        assert_eq!(camera.pan, Vec2::ZERO);
        assert!((camera.zoom - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_world_identity() {
        let camera = Camera::new();
        let screen = Point::new(100.0, 200.0);
        let world = camera.screen_to_world(screen);
        assert!((world.x - screen.x).abs() < f64::EPSILON);
        assert!((world.y - screen.y).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_world_with_pan() {
        let mut camera = Camera::new();
        camera.pan = Vec2::new(50.0, 100.0);
        let world = camera.screen_to_world(Point::new(100.0, 200.0));
        assert!((world.x - 50.0).abs() < f64::EPSILON);
        assert!((world.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_to_world_with_zoom() {
        let mut camera = Camera::new();
        camera.zoom = 2.0;
        let world = camera.screen_to_world(Point::new(100.0, 200.0));
        assert!((world.x - 50.0).abs() < f64::EPSILON);
        assert!((world.y - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let mut camera = Camera::new();
        camera.pan = Vec2::new(30.0, -20.0);
        camera.zoom = 1.5;

        let original = Point::new(123.0, 456.0);
        let world = camera.screen_to_world(original);
        let back = camera.world_to_screen(world);

        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.set_zoom(0.001);
        assert!((camera.zoom - MIN_ZOOM).abs() < f64::EPSILON);

        camera.set_zoom(1000.0);
        assert!((camera.zoom - MAX_ZOOM).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wheel_zoom_clamp() {
        let mut camera = Camera::new();
        // Huge scroll away from the canvas: clamps to min, never errors.
        camera.wheel_zoom(1_000_000.0);
        assert!((camera.zoom - MIN_ZOOM).abs() < f64::EPSILON);

        camera.wheel_zoom(-1_000_000.0);
        assert!((camera.zoom - MAX_ZOOM).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fit_never_zooms_in() {
        let mut camera = Camera::new();
        // Tiny content in a big viewport: zoom caps at 100%, no zoom-in.
        camera.fit_to_bounds(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Size::new(1000.0, 1000.0),
        );
        assert!(camera.zoom <= 1.0 + f64::EPSILON);
    }

    #[test]
    fn test_fit_centers_content() {
        let mut camera = Camera::new();
        let bounds = Rect::new(0.0, 0.0, 2000.0, 1000.0);
        let viewport = Size::new(1000.0, 500.0);
        camera.fit_to_bounds(bounds, viewport);

        // Content center maps to the viewport center.
        let screen_center = camera.world_to_screen(bounds.center());
        assert!((screen_center.x - 500.0).abs() < 1e-9);
        assert!((screen_center.y - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_degenerate_bounds_is_noop() {
        let mut camera = Camera::new();
        camera.pan = Vec2::new(7.0, 8.0);
        camera.fit_to_bounds(Rect::new(5.0, 5.0, 5.0, 5.0), Size::new(800.0, 600.0));
        assert_eq!(camera.pan, Vec2::new(7.0, 8.0));
    }
}
