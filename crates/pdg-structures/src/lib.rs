//! The core value types of PDG. Defines the colors and 2D geometry that game entities carry
//! and that the serialization engine knows how to encode compactly.
//!
//! ## Core Components
//!
//! - **[`Color`]** - RGBA color with floating point channels in the `0.0..=1.0` range
//! - **[`Offset`]** - 2D displacement. [`Point`] and [`Vector`] are aliases of it
//! - **[`Rect`]** - Axis aligned rectangle stored as left/top/right/bottom edges
//! - **[`RotatedRect`]** - A [`Rect`] with a rotation angle and a center adjustment
//! - **[`Quad`]** - Four arbitrary corner points
//!
//! ```rust
//! use pdg_structures::{Color, Point, Rect};
//!
//! let bounds = Rect::new(10.0, 20.0, 110.0, 70.0);
//! assert_eq!(bounds.width(), 100.0);
//! assert_eq!(bounds.left_top(), Point::new(10.0, 20.0));
//!
//! let red = Color::rgb(1.0, 0.0, 0.0);
//! assert!(red.is_opaque());
//! ```

mod color;
mod coordinates;

pub use color::Color;
pub use coordinates::{Offset, Point, Quad, Rect, RotatedRect, Vector};
