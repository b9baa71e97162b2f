//! Browser bindings: the Canvas 2D [`Surface`], the textarea
//! [`TextOverlay`] and small DOM helpers used by [`crate::engine::Engine`].
//!
//! Every fallible DOM call maps its `JsValue` error into [`RenderError`]
//! so callers handle browser failures like any other engine error.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlTextAreaElement};

use crate::error::{RenderError, SaveError};
use crate::surface::Surface;
use crate::text_edit::{TextOverlay, TextPlacement};

fn js_err(e: JsValue) -> RenderError {
    RenderError::Surface(format!("{e:?}"))
}

// =============================================================
// Canvas surface
// =============================================================

/// [`Surface`] over a `CanvasRenderingContext2d`.
pub struct WebSurface {
    ctx: CanvasRenderingContext2d,
}

impl WebSurface {
    /// Acquire the 2D context of `canvas`.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas cannot provide a 2D context.
    pub fn from_canvas(canvas: &HtmlCanvasElement) -> Result<Self, RenderError> {
        let ctx = canvas
            .get_context("2d")
            .map_err(js_err)?
            .ok_or_else(|| RenderError::Surface("2d context unavailable".to_owned()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| RenderError::Surface("context is not CanvasRenderingContext2d".to_owned()))?;
        Ok(Self { ctx })
    }
}

impl Surface for WebSurface {
    fn set_transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Result<(), RenderError> {
        self.ctx.set_transform(a, b, c, d, e, f).map_err(js_err)
    }

    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.clear_rect(x, y, width, height);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.fill_rect(x, y, width, height);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.stroke_rect(x, y, width, height);
    }

    fn set_fill_style(&mut self, color: &str) {
        self.ctx.set_fill_style_str(color);
    }

    fn set_stroke_style(&mut self, color: &str) {
        self.ctx.set_stroke_style_str(color);
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_line_dash(&mut self, segments: &[f64]) -> Result<(), RenderError> {
        let array = js_sys::Array::new();
        for s in segments {
            array.push(&JsValue::from_f64(*s));
        }
        self.ctx.set_line_dash(&array).map_err(js_err)
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ctx.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ctx.line_to(x, y);
    }

    fn ellipse(&mut self, cx: f64, cy: f64, rx: f64, ry: f64) -> Result<(), RenderError> {
        self.ctx.ellipse(cx, cy, rx, ry, 0.0, 0.0, std::f64::consts::TAU).map_err(js_err)
    }

    fn fill(&mut self) {
        self.ctx.fill();
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }

    fn set_font(&mut self, font: &str) {
        self.ctx.set_font(font);
    }

    fn set_text_baseline(&mut self, baseline: &str) {
        self.ctx.set_text_baseline(baseline);
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), RenderError> {
        self.ctx.fill_text(text, x, y).map_err(js_err)
    }
}

// =============================================================
// Text overlay
// =============================================================

/// [`TextOverlay`] backed by an absolutely positioned `<textarea>`.
pub struct DomTextOverlay {
    textarea: HtmlTextAreaElement,
}

impl DomTextOverlay {
    /// Create a hidden textarea as a sibling of `canvas`.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas is detached or the DOM rejects the
    /// element.
    pub fn create(canvas: &HtmlCanvasElement) -> Result<Self, RenderError> {
        let document =
            canvas.owner_document().ok_or_else(|| RenderError::Surface("canvas has no document".to_owned()))?;
        let parent = canvas.parent_element().ok_or_else(|| RenderError::Surface("canvas is detached".to_owned()))?;
        let textarea = document
            .create_element("textarea")
            .map_err(js_err)?
            .dyn_into::<HtmlTextAreaElement>()
            .map_err(|_| RenderError::Surface("created element is not a textarea".to_owned()))?;
        parent.append_child(&textarea).map_err(js_err)?;

        let style = textarea.style();
        for (name, value) in [
            ("position", "absolute"),
            ("display", "none"),
            ("margin", "0"),
            ("padding", "0"),
            ("border", "none"),
            ("outline", "none"),
            ("resize", "none"),
            ("overflow", "hidden"),
            ("background", "transparent"),
            ("line-height", "1.25"),
        ] {
            style.set_property(name, value).map_err(js_err)?;
        }
        Ok(Self { textarea })
    }
}

impl TextOverlay for DomTextOverlay {
    fn show(&mut self, placement: &TextPlacement) -> Result<(), RenderError> {
        let style = self.textarea.style();
        let r = placement.rect;
        style.set_property("left", &format!("{}px", r.x)).map_err(js_err)?;
        style.set_property("top", &format!("{}px", r.y)).map_err(js_err)?;
        style.set_property("width", &format!("{}px", r.width)).map_err(js_err)?;
        style.set_property("height", &format!("{}px", r.height)).map_err(js_err)?;
        style
            .set_property("font", &format!("{}px {}", placement.font_size_px, placement.font_family))
            .map_err(js_err)?;
        style.set_property("color", &placement.color).map_err(js_err)?;
        style.set_property("display", "block").map_err(js_err)?;
        if self.textarea.value() != placement.text {
            self.textarea.set_value(&placement.text);
        }
        self.textarea.focus().map_err(js_err)
    }

    fn hide(&mut self) -> Result<(), RenderError> {
        self.textarea.style().set_property("display", "none").map_err(js_err)
    }

    fn value(&self) -> String {
        self.textarea.value()
    }
}

// =============================================================
// Helpers
// =============================================================

/// Set the CSS cursor of the canvas element.
///
/// # Errors
///
/// Returns an error if the style update is rejected.
pub fn set_cursor(canvas: &HtmlCanvasElement, cursor: &str) -> Result<(), RenderError> {
    canvas.style().set_property("cursor", cursor).map_err(js_err)
}

/// Hand snapshot JSON to the host's save callback. A throwing callback is
/// a failed save.
///
/// # Errors
///
/// Returns [`SaveError::Host`] carrying the thrown value.
pub fn call_save(callback: &js_sys::Function, json: &str) -> Result<(), SaveError> {
    callback
        .call1(&JsValue::NULL, &JsValue::from_str(json))
        .map(|_| ())
        .map_err(|e| SaveError::Host(format!("{e:?}")))
}
