//! Browser integration with `google.maps.WebGLOverlayView`.
//!
//! [`WebOverlay`] creates the overlay view, forwards its lifecycle callbacks
//! to an [`OverlayAdapter`] rendering with [`GlowRenderer`], and rethrows
//! failures into JavaScript so they show up in the developer console.

mod overlay_view;

pub use overlay_view::WebGlOverlayView;

use crate::config::OverlayConfig;
use crate::geo::GeoPoint;
use crate::overlay::{
    CameraTransformer, ContextOptions, DrawOptions, OverlayAdapter, OverlayError, OverlayHost,
    ViewportSize,
};
use crate::render::GlowRenderer;
use overlay_view::{CoordinateTransformer, WebGlDrawOptions, WebGlStateOptions};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast as _;
use web_sys::{HtmlCanvasElement, WebGl2RenderingContext, WebGlRenderingContext};

type SharedAdapter = Rc<RefCell<OverlayAdapter<GlowRenderer>>>;
type Callback = Closure<dyn FnMut() -> Result<(), JsValue>>;

/// Callbacks registered on the overlay view. Dropping them while the view
/// can still call them makes those calls throw.
struct Callbacks {
    _on_add: Callback,
    _on_remove: Callback,
    _on_context_restored: Closure<dyn FnMut(WebGlStateOptions) -> Result<(), JsValue>>,
    _on_context_lost: Callback,
    _on_draw: Closure<dyn FnMut(WebGlDrawOptions) -> Result<(), JsValue>>,
}

/// A scene overlay on a Google map.
pub struct WebOverlay {
    view: WebGlOverlayView,
    adapter: SharedAdapter,
    _callbacks: Callbacks,
}

impl WebOverlay {
    /// Creates the overlay view. The Maps JavaScript API (with
    /// `WebGLOverlayView` support) must already be loaded.
    pub fn new(config: OverlayConfig) -> Result<Self, OverlayError> {
        check_maps_api()?;

        let view = WebGlOverlayView::new();
        let mut adapter = OverlayAdapter::new(config);
        adapter.set_host_surface(Some(Box::new(OverlayViewHost { view: view.clone() })));
        let adapter: SharedAdapter = Rc::new(RefCell::new(adapter));

        let callbacks = register_callbacks(&view, &adapter);
        log::info!("Created WebGL overlay view");

        Ok(Self {
            view,
            adapter,
            _callbacks: callbacks,
        })
    }

    /// Shows the overlay on `map` (a `google.maps.Map`).
    pub fn set_map(&self, map: &JsValue) {
        self.view.set_map(map);
    }

    /// Removes the overlay from its map.
    pub fn remove_from_map(&self) {
        self.view.set_map(&JsValue::NULL);
    }

    pub fn view(&self) -> &WebGlOverlayView {
        &self.view
    }

    /// Shared handle to the adapter, e.g. for hooks or raycasts from event
    /// handlers. Must not be borrowed across a host callback.
    pub fn adapter(&self) -> SharedAdapter {
        Rc::clone(&self.adapter)
    }

    pub fn request_redraw(&self) {
        self.adapter.borrow().request_redraw();
    }
}

impl Drop for WebOverlay {
    fn drop(&mut self) {
        // Detach first so the view stops calling into the callbacks.
        self.view.set_map(&JsValue::NULL);
    }
}

struct OverlayViewHost {
    view: WebGlOverlayView,
}

impl OverlayHost for OverlayViewHost {
    fn request_redraw(&self) {
        self.view.request_redraw();
    }

    fn is_attached(&self) -> bool {
        let map = self.view.get_map();
        !map.is_null() && !map.is_undefined()
    }
}

struct JsTransformer(CoordinateTransformer);

impl CameraTransformer for JsTransformer {
    fn from_lat_lng_altitude(&self, anchor: &GeoPoint) -> [f64; 16] {
        let literal = match serde_wasm_bindgen::to_value(anchor) {
            Ok(literal) => literal,
            Err(e) => {
                log::error!("Failed to convert reference point: {}", e);
                return IDENTITY;
            }
        };

        let matrix = self.0.from_lat_lng_altitude(&literal).to_vec();
        matrix.try_into().unwrap_or_else(|values: Vec<f64>| {
            log::error!("Expected a 4x4 matrix, got {} values", values.len());
            IDENTITY
        })
    }
}

const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

fn register_callbacks(view: &WebGlOverlayView, adapter: &SharedAdapter) -> Callbacks {
    let shared = Rc::clone(adapter);
    let on_add = Callback::new(move || shared.borrow_mut().on_add().map_err(to_js_error));
    view.set_on_add(&on_add);

    let shared = Rc::clone(adapter);
    let on_remove = Callback::new(move || shared.borrow_mut().on_remove().map_err(to_js_error));
    view.set_on_remove(&on_remove);

    let shared = Rc::clone(adapter);
    let on_context_restored = Closure::<dyn FnMut(WebGlStateOptions) -> Result<(), JsValue>>::new(
        move |options: WebGlStateOptions| {
            let gl = options.state_gl();
            let canvas_size = canvas_size(&gl).map_err(to_js_error)?;
            let context = Arc::new(glow_context(&gl).map_err(to_js_error)?);
            shared
                .borrow_mut()
                .on_context_restored(ContextOptions {
                    gl: &context,
                    canvas_size,
                })
                .map_err(to_js_error)
        },
    );
    view.set_on_context_restored(&on_context_restored);

    let shared = Rc::clone(adapter);
    let on_context_lost = Callback::new(move || {
        shared.borrow_mut().on_context_lost();
        Ok(())
    });
    view.set_on_context_lost(&on_context_lost);

    let shared = Rc::clone(adapter);
    let on_draw = Closure::<dyn FnMut(WebGlDrawOptions) -> Result<(), JsValue>>::new(
        move |options: WebGlDrawOptions| {
            let canvas_size = canvas_size(&options.draw_gl()).map_err(to_js_error)?;
            let transformer = JsTransformer(options.transformer());
            shared
                .borrow_mut()
                .on_draw(DrawOptions {
                    transformer: &transformer,
                    canvas_size,
                })
                .map_err(to_js_error)
        },
    );
    view.set_on_draw(&on_draw);

    Callbacks {
        _on_add: on_add,
        _on_remove: on_remove,
        _on_context_restored: on_context_restored,
        _on_context_lost: on_context_lost,
        _on_draw: on_draw,
    }
}

/// Fails with a setup error unless `google.maps.WebGLOverlayView` exists.
fn check_maps_api() -> Result<(), OverlayError> {
    let google = property(&js_sys::global(), "google");
    let maps = google.as_ref().and_then(|google| property(google, "maps"));
    let Some(maps) = maps else {
        return Err(OverlayError::Setup(
            "Google Maps API not loaded. Create the overlay after the API has been loaded"
                .to_string(),
        ));
    };

    if property(&maps, "WebGLOverlayView").is_none() {
        return Err(OverlayError::Setup(
            "WebGLOverlayView not found. Load a Maps API version that supports it".to_string(),
        ));
    }
    Ok(())
}

/// Reads a property, treating `null` and `undefined` as missing.
fn property(target: &JsValue, name: &str) -> Option<JsValue> {
    js_sys::Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .filter(|value| !value.is_null() && !value.is_undefined())
}

fn glow_context(gl: &JsValue) -> Result<glow::Context, OverlayError> {
    if let Some(gl2) = gl.dyn_ref::<WebGl2RenderingContext>() {
        Ok(glow::Context::from_webgl2_context(gl2.clone()))
    } else if let Some(gl1) = gl.dyn_ref::<WebGlRenderingContext>() {
        Ok(glow::Context::from_webgl1_context(gl1.clone()))
    } else {
        Err(OverlayError::Setup(
            "Host did not provide a WebGL rendering context".to_string(),
        ))
    }
}

fn canvas_size(gl: &JsValue) -> Result<ViewportSize, OverlayError> {
    let canvas = if let Some(gl2) = gl.dyn_ref::<WebGl2RenderingContext>() {
        gl2.canvas()
    } else if let Some(gl1) = gl.dyn_ref::<WebGlRenderingContext>() {
        gl1.canvas()
    } else {
        None
    };

    canvas
        .and_then(|canvas| canvas.dyn_into::<HtmlCanvasElement>().ok())
        .map(|canvas| ViewportSize::new(canvas.width(), canvas.height()))
        .ok_or_else(|| OverlayError::Setup("WebGL context has no canvas element".to_string()))
}

fn to_js_error(error: OverlayError) -> JsValue {
    js_sys::Error::new(&error.to_string()).into()
}
