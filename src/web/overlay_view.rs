//! Bindings for the parts of the Maps JavaScript API the overlay talks to.

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// `google.maps.WebGLOverlayView`
    #[wasm_bindgen(js_namespace = ["google", "maps"], js_name = WebGLOverlayView)]
    #[derive(Debug, Clone)]
    pub type WebGlOverlayView;

    #[wasm_bindgen(constructor, js_namespace = ["google", "maps"], js_class = "WebGLOverlayView")]
    pub fn new() -> WebGlOverlayView;

    /// Pass `null` to remove the overlay from its map.
    #[wasm_bindgen(method, js_name = setMap)]
    pub fn set_map(this: &WebGlOverlayView, map: &JsValue);

    /// The map the overlay is shown on, `null`/`undefined` when detached.
    #[wasm_bindgen(method, js_name = getMap)]
    pub fn get_map(this: &WebGlOverlayView) -> JsValue;

    #[wasm_bindgen(method, js_name = requestRedraw)]
    pub fn request_redraw(this: &WebGlOverlayView);

    #[wasm_bindgen(method, setter = onAdd)]
    pub fn set_on_add(this: &WebGlOverlayView, callback: &Closure<dyn FnMut() -> Result<(), JsValue>>);

    #[wasm_bindgen(method, setter = onRemove)]
    pub fn set_on_remove(
        this: &WebGlOverlayView,
        callback: &Closure<dyn FnMut() -> Result<(), JsValue>>,
    );

    #[wasm_bindgen(method, setter = onContextRestored)]
    pub fn set_on_context_restored(
        this: &WebGlOverlayView,
        callback: &Closure<dyn FnMut(WebGlStateOptions) -> Result<(), JsValue>>,
    );

    #[wasm_bindgen(method, setter = onContextLost)]
    pub fn set_on_context_lost(
        this: &WebGlOverlayView,
        callback: &Closure<dyn FnMut() -> Result<(), JsValue>>,
    );

    #[wasm_bindgen(method, setter = onDraw)]
    pub fn set_on_draw(
        this: &WebGlOverlayView,
        callback: &Closure<dyn FnMut(WebGlDrawOptions) -> Result<(), JsValue>>,
    );

    /// `google.maps.WebGLStateOptions`
    pub type WebGlStateOptions;

    #[wasm_bindgen(method, getter = gl)]
    pub fn state_gl(this: &WebGlStateOptions) -> JsValue;

    /// `google.maps.WebGLDrawOptions`
    pub type WebGlDrawOptions;

    #[wasm_bindgen(method, getter = gl)]
    pub fn draw_gl(this: &WebGlDrawOptions) -> JsValue;

    #[wasm_bindgen(method, getter)]
    pub fn transformer(this: &WebGlDrawOptions) -> CoordinateTransformer;

    /// `google.maps.CoordinateTransformer`, valid for a single frame.
    pub type CoordinateTransformer;

    /// Takes a `LatLngAltitudeLiteral` and returns a column-major 4x4 matrix.
    #[wasm_bindgen(method, js_name = fromLatLngAltitude)]
    pub fn from_lat_lng_altitude(
        this: &CoordinateTransformer,
        lat_lng_altitude: &JsValue,
    ) -> js_sys::Float64Array;
}
