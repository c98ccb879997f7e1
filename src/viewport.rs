//! Viewport state: fit-to-canvas, wheel zoom, pan, and debounced window
//! resizes. The manager owns an SVG viewBox plus a zoom-group transform;
//! fits rewrite the viewBox and reset the transform, interactive zoom and
//! pan only touch the transform.

use log::debug;

use crate::config::ViewportConfig;
use crate::events::{EngineEvent, EventBus, FitMode, ZoomDirection};
use crate::layout::types::Bounds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl ViewBox {
    pub fn attr(&self) -> String {
        format!("{:.2} {:.2} {:.2} {:.2}", self.x, self.y, self.w, self.h)
    }
}

/// Side panels that shrink the usable canvas while open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Properties,
    Think,
    Assistant,
}

/// Named transition applied to the next transform change, for hosts that
/// animate between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub name: &'static str,
    pub duration_ms: u32,
}

pub const FIT_TRANSITION: Transition = Transition {
    name: "viewbox-fit",
    duration_ms: 300,
};
pub const ZOOM_TRANSITION: Transition = Transition {
    name: "zoom-reset",
    duration_ms: 120,
};

pub struct ViewportManager {
    config: ViewportConfig,
    canvas_w: f32,
    canvas_h: f32,
    view_box: ViewBox,
    zoom: f32,
    tx: f32,
    ty: f32,
    open_panels: Vec<Panel>,
    transition: Option<Transition>,
    pending_resize: Option<(f32, f32, u64)>,
    last_fit: FitMode,
}

impl ViewportManager {
    pub fn new(config: ViewportConfig, canvas_w: f32, canvas_h: f32) -> Self {
        Self {
            config,
            canvas_w,
            canvas_h,
            view_box: ViewBox {
                x: 0.0,
                y: 0.0,
                w: canvas_w,
                h: canvas_h,
            },
            zoom: 1.0,
            tx: 0.0,
            ty: 0.0,
            open_panels: Vec::new(),
            transition: None,
            pending_resize: None,
            last_fit: FitMode::Full,
        }
    }

    pub fn zoom_level(&self) -> f32 {
        self.zoom
    }

    pub fn view_box(&self) -> ViewBox {
        self.view_box
    }

    /// Transform of the zoom group inside the viewBox.
    pub fn transform_attr(&self) -> String {
        format!(
            "translate({:.2} {:.2}) scale({:.4})",
            self.tx, self.ty, self.zoom
        )
    }

    pub fn preserve_aspect_ratio(&self) -> &'static str {
        "xMidYMid meet"
    }

    /// Transition the host should animate the last change with, if any.
    pub fn transition(&self) -> Option<Transition> {
        self.transition
    }

    pub fn open_panel(&mut self, panel: Panel) {
        if !self.open_panels.contains(&panel) {
            self.open_panels.push(panel);
        }
    }

    pub fn close_panel(&mut self, panel: Panel) {
        self.open_panels.retain(|p| *p != panel);
    }

    fn panel_strip(&self) -> f32 {
        self.open_panels
            .iter()
            .map(|p| match p {
                Panel::Properties => self.config.properties_panel_width,
                Panel::Think => self.config.think_panel_width,
                Panel::Assistant => self.config.assistant_panel_width,
            })
            .fold(0.0, f32::max)
    }

    /// Fit the content into the whole canvas. Resets zoom and pan so the
    /// viewBox alone frames the content.
    pub fn fit_to_full_canvas(&mut self, content: &Bounds, bus: &mut EventBus) {
        self.fit(content, FitMode::Full, true, bus);
    }

    /// Fit into the canvas minus the widest open side panel, so the content
    /// stays centered in the strip the panel leaves visible.
    pub fn fit_to_canvas_with_panel(&mut self, content: &Bounds, bus: &mut EventBus) {
        self.fit(content, FitMode::Panel, true, bus);
    }

    /// Synchronous export fit: fixed pixel padding, identity transform, no
    /// transition. Returns the viewBox the exporter should emit.
    pub fn fit_for_export(&mut self, content: &Bounds, bus: &mut EventBus) -> ViewBox {
        let padded = content.expanded(self.config.export_padding);
        self.view_box = ViewBox {
            x: padded.min_x,
            y: padded.min_y,
            w: padded.width(),
            h: padded.height(),
        };
        self.zoom = 1.0;
        self.tx = 0.0;
        self.ty = 0.0;
        self.transition = None;
        self.last_fit = FitMode::Export;
        bus.emit(EngineEvent::ViewFitted {
            mode: FitMode::Export,
        });
        self.view_box
    }

    fn fit(&mut self, content: &Bounds, mode: FitMode, animate: bool, bus: &mut EventBus) {
        let pad = self.config.fit_padding_ratio * content.width().min(content.height());
        let padded = content.expanded(pad.max(1.0));
        let mut view = ViewBox {
            x: padded.min_x,
            y: padded.min_y,
            w: padded.width(),
            h: padded.height(),
        };
        if mode == FitMode::Panel {
            let strip = self.panel_strip();
            let avail_w = (self.canvas_w - strip).max(1.0);
            // scale the visible strip would apply, then widen the viewBox to
            // the right so the panel overlays empty space, not content
            let scale = (avail_w / view.w).min(self.canvas_h / view.h);
            view.w += strip / scale;
        }
        self.view_box = view;
        self.zoom = 1.0;
        self.tx = 0.0;
        self.ty = 0.0;
        self.transition = animate.then_some(FIT_TRANSITION);
        self.last_fit = mode;
        bus.emit(EngineEvent::ViewFitted { mode });
    }

    /// Wheel zoom about the cursor. `delta` follows wheel convention:
    /// positive scrolls away (zoom out).
    pub fn wheel_zoom(&mut self, delta: f32, cx: f32, cy: f32, bus: &mut EventBus) {
        let factor = if delta < 0.0 {
            self.config.wheel_zoom_factor
        } else {
            1.0 / self.config.wheel_zoom_factor
        };
        let next = (self.zoom * factor).clamp(self.config.zoom_min, self.config.zoom_max);
        if (next - self.zoom).abs() < f32::EPSILON {
            return;
        }
        // keep the point under the cursor stationary
        let ratio = next / self.zoom;
        self.tx = cx - (cx - self.tx) * ratio;
        self.ty = cy - (cy - self.ty) * ratio;
        self.zoom = next;
        self.transition = Some(ZOOM_TRANSITION);
        bus.emit(EngineEvent::ViewZoomed {
            direction: if delta < 0.0 {
                ZoomDirection::In
            } else {
                ZoomDirection::Out
            },
            level: self.zoom,
        });
    }

    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.tx += dx;
        self.ty += dy;
        self.transition = None;
    }

    /// Record a resize; the refit happens in `poll` once the debounce window
    /// has passed without another resize.
    pub fn window_resized(&mut self, w: f32, h: f32, t_ms: u64) {
        self.pending_resize = Some((w, h, t_ms));
    }

    pub fn poll(&mut self, content: &Bounds, t_ms: u64, bus: &mut EventBus) {
        let Some((w, h, at_ms)) = self.pending_resize else {
            return;
        };
        if t_ms.saturating_sub(at_ms) < self.config.resize_debounce_ms {
            return;
        }
        self.pending_resize = None;
        self.canvas_w = w;
        self.canvas_h = h;
        debug!("refit after resize to {w}x{h}");
        let mode = if self.open_panels.is_empty() {
            FitMode::Full
        } else {
            FitMode::Panel
        };
        // resize refits jump, they do not animate
        self.fit(content, mode, false, bus);
    }

    /// Refit when the content has outgrown the frame, as after edits that
    /// widen the diagram.
    pub fn autofit_if_overflowing(&mut self, content: &Bounds, bus: &mut EventBus) {
        let visible_w = self.view_box.w / self.zoom;
        let visible_h = self.view_box.h / self.zoom;
        if visible_w < self.config.autofit_threshold * content.width()
            || visible_h < self.config.autofit_threshold * content.height()
        {
            let mode = if self.open_panels.is_empty() {
                FitMode::Full
            } else {
                FitMode::Panel
            };
            self.fit(content, mode, true, bus);
        }
    }
}
