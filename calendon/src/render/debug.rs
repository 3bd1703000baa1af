//! Vertex generation for debug shapes.

use smallvec::SmallVec;
use std::f32::consts::TAU;

/// Vertices of a debug shape.
pub type DebugVertices = SmallVec<[[f32; 2]; 32]>;

/// Corners of a rectangle in triangle strip order.
pub fn rect_strip(center: glm::Vec2, dimensions: glm::Vec2) -> [[f32; 2]; 4] {
    let half = dimensions * 0.5;
    [
        [center.x - half.x, center.y - half.y],
        [center.x + half.x, center.y - half.y],
        [center.x - half.x, center.y + half.y],
        [center.x + half.x, center.y + half.y],
    ]
}

/// Corners of a rectangle in line loop order.
pub fn rect_loop(center: glm::Vec2, dimensions: glm::Vec2) -> [[f32; 2]; 4] {
    let [a, b, c, d] = rect_strip(center, dimensions);
    [a, b, d, c]
}

/// Points approximating a circle of `radius` around the origin.
///
/// Yields `num_segments + 1` points evenly spaced around the circle, to be drawn as a closed loop.
pub fn circle_points(radius: f32, num_segments: u32) -> DebugVertices {
    let num_points = num_segments + 1;
    let step = TAU / num_points as f32;
    (0..num_points)
        .map(|idx| {
            let angle = idx as f32 * step;
            [radius * angle.cos(), radius * angle.sin()]
        })
        .collect()
}

/// Flatten points into vertex data.
pub fn points_to_vertices(points: &[glm::Vec2]) -> DebugVertices {
    points.iter().map(|p| [p.x, p.y]).collect()
}
