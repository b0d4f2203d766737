use crate::{
    graphics::Rect,
    stroke::{Brush, StrokeInput},
};
use lyon::{
    geom::point,
    lyon_tessellation::{
        BuffersBuilder, FillOptions, FillTessellator, FillVertex, LineCap, LineJoin,
        StrokeOptions, StrokeTessellator, StrokeVertex, VertexBuffers,
    },
    math::Point,
    path::Path,
};

pub type Mesh = VertexBuffers<Point, u32>;

pub const TOLERANCE: f32 = 0.01;

pub fn stroke_options() -> StrokeOptions {
    StrokeOptions::default()
        .with_line_cap(LineCap::Round)
        .with_line_join(LineJoin::Round)
        .with_tolerance(TOLERANCE)
        .with_variable_line_width(0)
}

fn width(input: &StrokeInput, brush: &Brush) -> f32 {
    if brush.family.uses_pressure() {
        input.pressure * brush.size
    } else {
        brush.size
    }
}

/// Triangulates the stroke outline. Width follows pressure unless the brush ignores it.
///
/// A stroke that never leaves its first point becomes a dot as wide as its widest input.
pub fn tessellate(inputs: &[StrokeInput], brush: &Brush) -> Mesh {
    let mut mesh = Mesh::new();

    let first = match inputs.first() {
        Some(first) => first,
        None => return mesh,
    };

    if inputs
        .iter()
        .all(|input| input.x == first.x && input.y == first.y)
    {
        let widest = inputs
            .iter()
            .map(|input| width(input, brush))
            .fold(0., f32::max);
        return dot(point(first.x, first.y), widest / 2.);
    }

    let mut path = Path::builder_with_attributes(1);
    path.begin(point(first.x, first.y), &[width(first, brush)]);
    inputs.iter().skip(1).for_each(|input| {
        path.line_to(point(input.x, input.y), &[width(input, brush)]);
    });
    path.end(false);
    let path = path.build();

    let mut tessellator = StrokeTessellator::new();
    let result = {
        let mut builder = BuffersBuilder::new(&mut mesh, |vertex: StrokeVertex| vertex.position());
        tessellator.tessellate_path(&path, &stroke_options(), &mut builder)
    };

    if let Err(err) = result {
        tracing::error!("could not tessellate stroke of {} inputs: {err:?}", inputs.len());
        return Mesh::new();
    }

    mesh
}

fn dot(center: Point, radius: f32) -> Mesh {
    let mut mesh = Mesh::new();
    if radius <= 0. {
        return mesh;
    }

    let mut tessellator = FillTessellator::new();
    let result = {
        let mut builder = BuffersBuilder::new(&mut mesh, |vertex: FillVertex| vertex.position());
        tessellator.tessellate_circle(
            center,
            radius,
            &FillOptions::default().with_tolerance(TOLERANCE),
            &mut builder,
        )
    };

    if let Err(err) = result {
        tracing::error!("could not tessellate dot at {center:?}: {err:?}");
        return Mesh::new();
    }

    mesh
}

pub fn mesh_bounds(mesh: &Mesh) -> Option<Rect> {
    let first = mesh.vertices.first()?;
    Some(mesh.vertices.iter().skip(1).fold(
        Rect::new(first.x, first.y, first.x, first.y),
        |rect, vertex| Rect {
            left: rect.left.min(vertex.x),
            top: rect.top.min(vertex.y),
            right: rect.right.max(vertex.x),
            bottom: rect.bottom.max(vertex.y),
        },
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::stroke::BrushFamily;

    fn line(pressure: f32) -> Vec<StrokeInput> {
        (0..5)
            .map(|i| StrokeInput {
                x: i as f32 * 4.,
                y: 0.,
                time_millis: i * 8,
                pressure,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn empty_inputs_make_empty_mesh() {
        let mesh = tessellate(&[], &Brush::default());
        assert!(mesh.vertices.is_empty());
        assert!(mesh_bounds(&mesh).is_none());
    }

    #[test]
    fn single_input_is_a_dot() {
        let tap = StrokeInput {
            x: 10.,
            y: 20.,
            pressure: 1.,
            ..Default::default()
        };
        let brush = Brush::default();

        let mesh = tessellate(&[tap], &brush);
        assert!(!mesh.indices.is_empty());
        let bounds = mesh_bounds(&mesh).unwrap();
        let radius = brush.size / 2.;
        assert!((bounds.left - (10. - radius)).abs() < 0.05);
        assert!((bounds.right - (10. + radius)).abs() < 0.05);
        assert!((bounds.top - (20. - radius)).abs() < 0.05);
        assert!((bounds.bottom - (20. + radius)).abs() < 0.05);

        // held in place for a while
        let held = [tap, StrokeInput { time_millis: 30, ..tap }];
        assert_eq!(mesh_bounds(&tessellate(&held, &brush)), Some(bounds));
    }

    #[test]
    fn pressure_modulates_width() {
        let brush = Brush::default();
        let light = mesh_bounds(&tessellate(&line(0.2), &brush)).unwrap();
        let heavy = mesh_bounds(&tessellate(&line(1.0), &brush)).unwrap();
        assert!(light.height() < heavy.height());
    }

    #[test]
    fn highlighter_ignores_pressure() {
        let brush = Brush {
            family: BrushFamily::Highlighter,
            ..Brush::default()
        };
        let light = mesh_bounds(&tessellate(&line(0.2), &brush)).unwrap();
        let heavy = mesh_bounds(&tessellate(&line(1.0), &brush)).unwrap();
        assert!((light.height() - heavy.height()).abs() < 0.001);
    }
}
