use crate::error::{EaselError, ErrorKind};
use glam::{Affine2, Mat2, Vec2};
use std::fmt::{Display, Formatter};

pub type Color = [f32; 4];

pub trait ColorExt {
    const WHITE: Color = [1., 1., 1., 1.];
    const BLACK: Color = [0., 0., 0., 1.];
    const RED: Color = [1., 0., 0., 1.];
    const BLUE: Color = [0., 0., 1., 1.];

    fn to_argb(&self) -> u32;
    fn from_argb(argb: u32) -> Self;

    /// sRGB color longs keep the ARGB word in the upper half.
    fn to_color_long(&self) -> u64 {
        (self.to_argb() as u64) << 32
    }

    fn from_color_long(color: u64) -> Self
    where
        Self: Sized,
    {
        Self::from_argb((color >> 32) as u32)
    }
}

impl ColorExt for Color {
    fn to_argb(&self) -> u32 {
        let [r, g, b, a] = self.map(|channel| (channel.clamp(0., 1.) * 255.).round() as u32);
        (a << 24) | (r << 16) | (g << 8) | b
    }

    fn from_argb(argb: u32) -> Color {
        let channel = |shift: u32| ((argb >> shift) & 0xff) as f32 / 255.;
        [channel(16), channel(8), channel(0), channel(24)]
    }
}

macro_rules! coordinate_types {
    ($($Coord:ident),*) => {$(
        #[derive(Default, Debug, Clone, Copy, PartialEq)]
        pub struct $Coord {
            pub x: f32,
            pub y: f32,
        }

        impl Display for $Coord {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.02},{:.02}", self.x, self.y)
            }
        }

        impl From<$Coord> for Vec2 {
            fn from(pos: $Coord) -> Vec2 {
                Vec2::new(pos.x, pos.y)
            }
        }

        impl From<Vec2> for $Coord {
            fn from(v: Vec2) -> $Coord {
                $Coord { x: v.x, y: v.y }
            }
        }
    )*};
}

coordinate_types!(PixelPos, StrokePos);

impl PixelPos {
    pub fn distance(self, other: PixelPos) -> f32 {
        Vec2::from(self).distance(Vec2::from(other))
    }

    pub fn midpoint(self, other: PixelPos) -> PixelPos {
        PixelPos {
            x: (self.x + other.x) / 2.,
            y: (self.y + other.y) / 2.,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        left: 0.,
        top: 0.,
        right: 0.,
        bottom: 0.,
    };

    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Rect {
        Rect {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0. || self.height() <= 0.
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left <= other.right
            && self.right >= other.left
            && self.top <= other.bottom
            && self.bottom >= other.top
    }

    /// Axis-aligned bounds of this rect after `xform`.
    pub fn transformed(&self, xform: &Affine2) -> Rect {
        let corners = [
            Vec2::new(self.left, self.top),
            Vec2::new(self.right, self.top),
            Vec2::new(self.left, self.bottom),
            Vec2::new(self.right, self.bottom),
        ]
        .map(|corner| xform.transform_point2(corner));

        corners.iter().skip(1).fold(
            Rect::new(corners[0].x, corners[0].y, corners[0].x, corners[0].y),
            |rect, corner| Rect {
                left: rect.left.min(corner.x),
                top: rect.top.min(corner.y),
                right: rect.right.max(corner.x),
                bottom: rect.bottom.max(corner.y),
            },
        )
    }
}

impl Display for Rect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.02},{:.02} {:.02},{:.02}]",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Horizontal scale term of `xform`. Only meaningful for uniform scales.
pub fn matrix_scale(xform: &Affine2) -> f32 {
    xform.matrix2.x_axis.x
}

/// Applies `delta` after `base`.
pub fn post_concat(base: &Affine2, delta: &Affine2) -> Affine2 {
    *delta * *base
}

/// Row-major 3x3 values: scale x, skew x, translate x, skew y, scale y, translate y, then the
/// perspective row.
pub fn matrix_values(xform: &Affine2) -> [f32; 9] {
    let Affine2 {
        matrix2,
        translation,
    } = *xform;

    [
        matrix2.x_axis.x,
        matrix2.y_axis.x,
        translation.x,
        matrix2.x_axis.y,
        matrix2.y_axis.y,
        translation.y,
        0.,
        0.,
        1.,
    ]
}

pub fn matrix_from_values(values: &[f32]) -> Result<Affine2, EaselError> {
    let malformed = || {
        let text = values
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(",");
        EaselError::new(ErrorKind::MalformedTransform(text))
    };

    let [sx, kx, tx, ky, sy, ty, p0, p1, p2]: [f32; 9] =
        values.try_into().map_err(|_| malformed())?;

    if p0 != 0. || p1 != 0. || p2 != 1. {
        return Err(malformed());
    }

    Ok(Affine2 {
        matrix2: Mat2::from_cols(Vec2::new(sx, ky), Vec2::new(kx, sy)),
        translation: Vec2::new(tx, ty),
    })
}

pub fn transform_to_string(xform: &Affine2) -> String {
    matrix_values(xform)
        .iter()
        .map(|value| value.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn transform_from_str(text: &str) -> Result<Affine2, EaselError> {
    let values = text
        .split(',')
        .map(|value| value.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| EaselError::new(ErrorKind::MalformedTransform(text.to_string())))?;

    matrix_from_values(&values)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn color_long_keeps_argb_in_upper_word() {
        let long = Color::BLACK.to_color_long();
        assert_eq!(long, 0xff00_0000_0000_0000);
        assert_eq!(Color::from_color_long(long), Color::BLACK);
        assert_eq!(Color::RED.to_argb(), 0xffff_0000);
        assert_eq!(Color::from_argb(0xff00_00ff), Color::BLUE);
    }

    #[test]
    fn transform_string_matches_row_major_layout() {
        let xform =
            Affine2::from_translation(Vec2::new(10., -4.)) * Affine2::from_scale(Vec2::splat(2.));

        assert_eq!(transform_to_string(&xform), "2,0,10,0,2,-4,0,0,1");
        let parsed = transform_from_str("2,0,10,0,2,-4,0,0,1").unwrap();
        assert!(parsed.abs_diff_eq(xform, 1e-6));
    }

    #[test]
    fn rejects_perspective_and_garbage() {
        assert!(transform_from_str("1,0,0,0,1,0,0.5,0,1").is_err());
        assert!(transform_from_str("1,0,0").is_err());
        assert!(transform_from_str("a,b,c,d,e,f,g,h,i").is_err());
    }

    #[test]
    fn post_concat_applies_delta_last() {
        let base = Affine2::from_scale(Vec2::splat(2.));
        let delta = Affine2::from_translation(Vec2::new(5., 0.));
        let combined = post_concat(&base, &delta);
        let point = combined.transform_point2(Vec2::new(1., 1.));
        assert_eq!(point, Vec2::new(7., 2.));
        assert_eq!(matrix_scale(&combined), 2.);
    }

    #[test]
    fn rect_union_and_transform() {
        let a = Rect::new(0., 0., 1., 1.);
        let b = Rect::new(-1., 0.5, 0.5, 3.);
        assert_eq!(a.union(&b), Rect::new(-1., 0., 1., 3.));

        let moved = a.transformed(
            &(Affine2::from_translation(Vec2::new(1., 2.)) * Affine2::from_scale(Vec2::splat(3.))),
        );
        assert_eq!(moved, Rect::new(1., 2., 4., 5.));
        assert!(moved.intersects(&Rect::new(3., 4., 10., 10.)));
        assert!(!moved.intersects(&Rect::new(5., 6., 10., 10.)));
    }
}
