//! Drawing target abstraction.
//!
//! [`Surface`] is the subset of the Canvas 2D API the renderer uses, with
//! the same method names and argument order. The browser implementation in
//! [`crate::web`] forwards each call to `CanvasRenderingContext2d`; tests use
//! a recording implementation.

use crate::error::RenderError;

/// A 2D immediate-mode drawing surface.
pub trait Surface {
    /// Replace the current transform matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the matrix.
    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<(), RenderError>;

    fn save(&mut self);
    fn restore(&mut self);

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn set_fill_style(&mut self, color: &str);
    fn set_stroke_style(&mut self, color: &str);
    fn set_line_width(&mut self, width: f64);

    /// Set the dash pattern; an empty slice draws solid lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the pattern.
    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), RenderError>;

    fn begin_path(&mut self);
    fn close_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);

    /// Add a full ellipse to the current path.
    ///
    /// # Errors
    ///
    /// Returns an error for negative radii.
    fn ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) -> Result<(), RenderError>;

    fn fill(&mut self);
    fn stroke(&mut self);

    fn set_font(&mut self, font: &str);
    fn set_text_baseline(&mut self, baseline: &str);

    /// Draw a line of text at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the call.
    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), RenderError>;
}
