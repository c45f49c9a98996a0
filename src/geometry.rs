//! PDF user space to screen space transforms
//!
//! PDF pages put the origin at the bottom-left corner with y growing upward,
//! measured in points. Rendered surfaces put the origin at the top-left with y
//! growing downward, measured in pixels. Everything that places or hit-tests a
//! field overlay goes through this module.

/// Page dimensions in points at a reference scale of 1.0
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageViewport {
    pub width: f32,
    pub height: f32,
}

impl PageViewport {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// US Letter, used when a page carries no usable MediaBox
    pub const LETTER: Self = Self::new(612.0, 792.0);

    /// True if both dimensions are finite and positive
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Field rectangle in PDF user space (y-up, origin bottom-left)
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct FieldBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FieldBounds {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build bounds from an annotation rectangle `[x0, y0, x1, y1]`.
    ///
    /// Corners may be given in any order, so the result never has a negative
    /// width or height.
    #[must_use]
    pub fn from_rect(rect: [f32; 4]) -> Self {
        let [x0, y0, x1, y1] = rect;
        let left = x0.min(x1);
        let bottom = y0.min(y1);
        Self {
            x: left,
            y: bottom,
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    /// Top edge in user space
    #[must_use]
    pub fn top(&self) -> f32 {
        self.y + self.height
    }
}

/// Offset of the rendered surface inside its scrollable container, in pixels
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct SurfaceOffset {
    pub x: f32,
    pub y: f32,
}

impl SurfaceOffset {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Point in screen pixels (y-down)
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rectangle in screen pixels (y-down, origin top-left)
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ScreenRect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Half-open containment: left/top edges are inside, right/bottom are not
    #[must_use]
    pub fn contains(&self, point: ScreenPoint) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }
}

/// Map field bounds onto a rendered surface.
///
/// The rendered raster dimensions are authoritative, so X and Y get their own
/// scale factors instead of the nominal zoom. Degenerate viewports fall back
/// to a uniform mapping derived from the rendered width.
#[must_use]
pub fn to_screen_rect(
    bounds: &FieldBounds,
    viewport: &PageViewport,
    rendered_width: f32,
    rendered_height: f32,
    offset: SurfaceOffset,
) -> ScreenRect {
    if !viewport.is_usable() {
        return to_screen_rect_fallback(bounds, fallback_scale(rendered_width), rendered_height);
    }

    let scale_x = rendered_width / viewport.width;
    let scale_y = rendered_height / viewport.height;

    ScreenRect {
        x: bounds.x * scale_x + offset.x,
        y: (viewport.height - bounds.top()) * scale_y + offset.y,
        width: bounds.width * scale_x,
        height: bounds.height * scale_y,
    }
}

/// Inverse of [`to_screen_rect`]
#[must_use]
pub fn from_screen_rect(
    rect: &ScreenRect,
    viewport: &PageViewport,
    rendered_width: f32,
    rendered_height: f32,
    offset: SurfaceOffset,
) -> FieldBounds {
    if !viewport.is_usable() {
        return from_screen_rect_fallback(rect, fallback_scale(rendered_width), rendered_height);
    }

    let scale_x = rendered_width / viewport.width;
    let scale_y = rendered_height / viewport.height;

    let width = rect.width / scale_x;
    let height = rect.height / scale_y;
    let x = (rect.x - offset.x) / scale_x;
    let top = viewport.height - (rect.y - offset.y) / scale_y;

    FieldBounds {
        x,
        y: top - height,
        width,
        height,
    }
}

/// Degraded mapping for fields without viewport metadata.
///
/// Uses the nominal zoom for both axes, flips against the rendered surface
/// height and ignores the surface offset.
#[must_use]
pub fn to_screen_rect_fallback(
    bounds: &FieldBounds,
    scale: f32,
    rendered_height: f32,
) -> ScreenRect {
    ScreenRect {
        x: bounds.x * scale,
        y: rendered_height - bounds.top() * scale,
        width: bounds.width * scale,
        height: bounds.height * scale,
    }
}

/// Inverse of [`to_screen_rect_fallback`]
#[must_use]
pub fn from_screen_rect_fallback(
    rect: &ScreenRect,
    scale: f32,
    rendered_height: f32,
) -> FieldBounds {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    let width = rect.width / scale;
    let height = rect.height / scale;
    let top = (rendered_height - rect.y) / scale;
    FieldBounds {
        x: rect.x / scale,
        y: top - height,
        width,
        height,
    }
}

/// Uniform zoom implied by a surface when the page size is unknown
fn fallback_scale(rendered_width: f32) -> f32 {
    if rendered_width.is_finite() && rendered_width > 0.0 {
        rendered_width / PageViewport::LETTER.width
    } else {
        1.0
    }
}

/// Place a field on a rendered surface, choosing the exact or fallback path.
#[must_use]
pub fn project(
    bounds: &FieldBounds,
    viewport: Option<&PageViewport>,
    surface: (f32, f32),
    scale: f32,
    offset: SurfaceOffset,
) -> ScreenRect {
    let (rendered_width, rendered_height) = surface;
    match viewport {
        Some(viewport) => {
            to_screen_rect(bounds, viewport, rendered_width, rendered_height, offset)
        }
        None => to_screen_rect_fallback(bounds, scale, rendered_height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_name_field_scenario() {
        let bounds = FieldBounds::from_rect([100.0, 500.0, 300.0, 530.0]);
        let viewport = PageViewport::new(600.0, 800.0);

        let rect = to_screen_rect(&bounds, &viewport, 600.0, 800.0, SurfaceOffset::default());

        assert_eq!(rect, ScreenRect::new(100.0, 270.0, 200.0, 30.0));
    }

    #[test]
    fn doubles_with_rendered_surface() {
        let bounds = FieldBounds::new(100.0, 500.0, 200.0, 30.0);
        let viewport = PageViewport::new(600.0, 800.0);

        let rect = to_screen_rect(&bounds, &viewport, 1200.0, 1600.0, SurfaceOffset::new(16.0, 8.0));

        assert_eq!(rect, ScreenRect::new(216.0, 548.0, 400.0, 60.0));
    }

    #[test]
    fn non_uniform_surface_scales_axes_independently() {
        let bounds = FieldBounds::new(0.0, 0.0, 100.0, 100.0);
        let viewport = PageViewport::new(100.0, 100.0);

        let rect = to_screen_rect(&bounds, &viewport, 201.0, 99.0, SurfaceOffset::default());

        assert!((rect.width - 201.0).abs() < 1e-4);
        assert!((rect.height - 99.0).abs() < 1e-4);
    }

    #[test]
    fn from_rect_normalizes_swapped_corners() {
        let bounds = FieldBounds::from_rect([300.0, 530.0, 100.0, 500.0]);
        assert_eq!(bounds, FieldBounds::new(100.0, 500.0, 200.0, 30.0));
    }

    #[test]
    fn fallback_ignores_offset_and_uses_uniform_scale() {
        let bounds = FieldBounds::new(10.0, 20.0, 30.0, 40.0);

        let rect = project(&bounds, None, (1224.0, 1584.0), 2.0, SurfaceOffset::new(50.0, 50.0));

        assert_eq!(rect, ScreenRect::new(20.0, 1584.0 - 120.0, 60.0, 80.0));
    }

    #[test]
    fn degenerate_viewport_does_not_divide_by_zero() {
        let bounds = FieldBounds::new(10.0, 20.0, 30.0, 40.0);
        let rect = to_screen_rect(
            &bounds,
            &PageViewport::new(0.0, 0.0),
            612.0,
            792.0,
            SurfaceOffset::default(),
        );
        assert!(rect.x.is_finite() && rect.y.is_finite());
        assert!(rect.width.is_finite() && rect.height.is_finite());
    }

    #[test]
    fn contains_is_half_open() {
        let rect = ScreenRect::new(10.0, 10.0, 5.0, 5.0);
        assert!(rect.contains(ScreenPoint::new(10.0, 10.0)));
        assert!(rect.contains(ScreenPoint::new(14.9, 14.9)));
        assert!(!rect.contains(ScreenPoint::new(15.0, 12.0)));
        assert!(!rect.contains(ScreenPoint::new(12.0, 15.0)));
    }

    #[test]
    fn inverse_recovers_bounds() {
        let bounds = FieldBounds::new(72.5, 144.25, 180.0, 22.0);
        let viewport = PageViewport::new(612.0, 792.0);
        let offset = SurfaceOffset::new(12.0, 4.0);

        let rect = to_screen_rect(&bounds, &viewport, 918.0, 1188.0, offset);
        let back = from_screen_rect(&rect, &viewport, 918.0, 1188.0, offset);

        assert!((back.x - bounds.x).abs() < 1e-3);
        assert!((back.y - bounds.y).abs() < 1e-3);
        assert!((back.width - bounds.width).abs() < 1e-3);
        assert!((back.height - bounds.height).abs() < 1e-3);
    }

    #[test]
    fn inverse_handles_degenerate_viewport() {
        let bounds = FieldBounds::new(100.0, 500.0, 200.0, 30.0);
        let viewport = PageViewport::new(0.0, 0.0);

        let rect = to_screen_rect(&bounds, &viewport, 612.0, 792.0, SurfaceOffset::default());
        let back = from_screen_rect(&rect, &viewport, 612.0, 792.0, SurfaceOffset::default());

        assert!(back.x.is_finite() && back.y.is_finite());
        assert_eq!(back, bounds);
    }
}
