//! Scene overlay driven by a map host.
//!
//! The host owns the graphics context and decides when frames are drawn.
//! [`OverlayAdapter`] reacts to the host's lifecycle calls:
//!
//! - `on_add` / `on_remove` when the overlay joins or leaves a map,
//! - `on_context_restored` / `on_context_lost` when the graphics context
//!   becomes available or goes away,
//! - `on_draw` for every frame.
//!
//! The camera has no state of its own. Each frame the host supplies a
//! matrix that maps meters around the reference point straight to clip
//! space, and that matrix is applied to the camera unchanged.

mod error;
mod hooks;
mod host;

pub use error::OverlayError;
pub use hooks::{FrameContext, HookKind, HookResult};
pub use host::{CameraTransformer, ContextOptions, DrawOptions, OverlayHost, ViewportSize};

use crate::config::OverlayConfig;
use crate::geo::{self, GeoPoint};
use crate::render::SceneRenderer;
use crate::scene::{Camera, Intersection, ObjectId, RaycastParams, Raycaster, Scene};
use glam::{DMat4, Vec2, Vec3};
use hooks::{HookOutcome, Hooks};
use std::cell::Cell;
use web_time::{Duration, Instant};

/// Where the overlay stands in its host lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    /// Not shown on a map
    Detached,
    /// On a map, but without a graphics context to draw into
    AttachedNoSurface,
    /// On a map with a live renderer
    AttachedRendering,
}

/// Options for [`OverlayAdapter::raycast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastOptions {
    /// Also test descendants of explicitly passed targets
    pub recursive: bool,
    /// Recompute the inverse projection. Set to false for additional
    /// raycasts in the same frame to reuse the previous inverse.
    pub update_matrix: bool,
    /// Distance limits for this raycast only
    pub params: Option<RaycastParams>,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            update_matrix: true,
            params: None,
        }
    }
}

/// Renders a scene anchored at a geographic reference point on a map host.
pub struct OverlayAdapter<R: SceneRenderer> {
    host: Option<Box<dyn OverlayHost>>,
    /// Set between `on_add` and `on_remove`
    added: bool,
    renderer: Option<R>,
    scene: Scene,
    camera: Camera,
    reference_point: GeoPoint,
    viewport: ViewportSize,
    raycaster: Raycaster,
    projection_inverse: Option<DMat4>,
    redraw_pending: Cell<bool>,
    hooks: Hooks,
    frame_budget: Duration,
}

impl<R: SceneRenderer> OverlayAdapter<R> {
    /// Creates a detached overlay with a freshly lit scene.
    pub fn new(config: OverlayConfig) -> Self {
        let mut scene = Scene::new();
        config.lighting.apply(&mut scene);

        Self {
            host: None,
            added: false,
            renderer: None,
            scene,
            camera: Camera::new(),
            reference_point: config.reference_point,
            viewport: ViewportSize::ZERO,
            raycaster: Raycaster::new(),
            projection_inverse: None,
            redraw_pending: Cell::new(false),
            hooks: Hooks::default(),
            frame_budget: config.frame_budget(),
        }
    }

    /// Creates an overlay with default settings anchored at `reference_point`.
    pub fn with_reference_point(reference_point: GeoPoint) -> Self {
        Self::new(OverlayConfig::new(reference_point))
    }

    /// Binds the overlay to a host surface; `None` unbinds it.
    pub fn set_host_surface(&mut self, host: Option<Box<dyn OverlayHost>>) {
        match &host {
            Some(_) => log::debug!("Overlay bound to host surface"),
            None => log::debug!("Overlay unbound from host surface"),
        }
        self.host = host;
        self.redraw_pending.set(false);
    }

    pub fn state(&self) -> OverlayState {
        if !self.is_attached() {
            OverlayState::Detached
        } else if self.renderer.is_none() {
            OverlayState::AttachedNoSurface
        } else {
            OverlayState::AttachedRendering
        }
    }

    /// Whether the overlay is on a map according to both the lifecycle
    /// calls and the host itself.
    ///
    /// Some hosts keep calling draw after the overlay was removed; those
    /// frames must be ignored.
    pub fn is_attached(&self) -> bool {
        self.added && self.host.as_ref().is_some_and(|host| host.is_attached())
    }

    /// Moves the scene origin. Existing scene content is not re-projected.
    pub fn set_reference_point(&mut self, reference_point: GeoPoint) {
        self.reference_point = reference_point;
    }

    pub fn reference_point(&self) -> GeoPoint {
        self.reference_point
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Last known canvas size; zero before the first context or after it was lost.
    pub fn viewport_size(&self) -> ViewportSize {
        self.viewport
    }

    /// Asks the host for a new frame.
    ///
    /// Ignored unless the overlay is attached with a live renderer. Requests
    /// made before the next frame collapse into one.
    pub fn request_redraw(&self) {
        if self.state() != OverlayState::AttachedRendering {
            log::debug!("Ignoring redraw request in state {:?}", self.state());
            return;
        }
        if self.redraw_pending.replace(true) {
            return;
        }
        if let Some(host) = &self.host {
            host.request_redraw();
        }
    }

    /// Converts a geographic point to scene coordinates.
    pub fn geo_to_local(&self, point: &GeoPoint) -> Vec3 {
        geo::forward(point, &self.reference_point).as_vec3()
    }

    /// Converts scene coordinates to a geographic point.
    pub fn local_to_geo(&self, point: Vec3) -> GeoPoint {
        geo::inverse(point.as_dvec3(), &self.reference_point)
    }

    /// Registers the hook run when the overlay is added to a map.
    pub fn set_on_add(&mut self, hook: impl FnMut(&mut Scene) -> HookResult + 'static) {
        self.hooks.on_add = Some(Box::new(hook));
    }

    /// Registers the hook run after the overlay was removed from a map.
    pub fn set_on_remove(&mut self, hook: impl FnMut(&mut Scene) -> HookResult + 'static) {
        self.hooks.on_remove = Some(Box::new(hook));
    }

    /// Registers the hook run before every rendered frame.
    ///
    /// The hook runs synchronously inside the host's frame and must not block.
    pub fn set_update(
        &mut self,
        hook: impl FnMut(&mut FrameContext<'_>) -> HookResult + 'static,
    ) {
        self.hooks.update = Some(Box::new(hook));
    }

    /// Removes all registered hooks.
    pub fn clear_hooks(&mut self) {
        self.hooks = Hooks::default();
    }

    /// Casts a ray from a normalized screen point (x/y in [-1, 1], y up).
    ///
    /// Tests the whole scene recursively unless `targets` is given. Returns
    /// hits nearest first, or nothing before the first frame was drawn.
    pub fn raycast(
        &mut self,
        point: Vec2,
        targets: Option<&[ObjectId]>,
        options: RaycastOptions,
    ) -> Vec<Intersection> {
        let Some(projection) = self.camera.projection() else {
            log::debug!("Raycast before the first frame");
            return Vec::new();
        };

        if options.update_matrix || self.projection_inverse.is_none() {
            self.projection_inverse = Some(projection.inverse());
        }
        let Some(inverse) = self.projection_inverse else {
            return Vec::new();
        };
        if !self.raycaster.set_from_screen_point(point, &inverse) {
            log::debug!("Projection cannot be inverted, raycast skipped");
            return Vec::new();
        }

        let previous = self.raycaster.params;
        if let Some(params) = options.params {
            self.raycaster.params = params;
        }

        let hits = match targets {
            None => self
                .raycaster
                .intersect_object(&self.scene, self.scene.root(), true),
            Some(targets) => {
                self.raycaster
                    .intersect_objects(&self.scene, targets, options.recursive)
            }
        };

        self.raycaster.params = previous;
        hits
    }

    /// Host lifecycle: the overlay was added to a map.
    pub fn on_add(&mut self) -> Result<(), OverlayError> {
        if self.added {
            log::debug!("Overlay already added");
            return Ok(());
        }
        self.added = true;
        log::info!("Overlay added to map");

        let scene = &mut self.scene;
        match self.hooks.on_add.as_mut() {
            Some(hook) => hooks::invoke(HookKind::Add, || hook(scene)).into_result(),
            None => Ok(()),
        }
    }

    /// Host lifecycle: the overlay was removed from its map.
    pub fn on_remove(&mut self) -> Result<(), OverlayError> {
        if !self.added {
            log::debug!("Overlay already removed");
            return Ok(());
        }
        self.added = false;
        self.redraw_pending.set(false);
        log::info!("Overlay removed from map");

        let scene = &mut self.scene;
        match self.hooks.on_remove.as_mut() {
            Some(hook) => hooks::invoke(HookKind::Remove, || hook(scene)).into_result(),
            None => Ok(()),
        }
    }

    /// Host lifecycle: a graphics context is available.
    ///
    /// Creates the renderer on the host's context. The renderer never
    /// clears, since the scene is composited onto the map's framebuffer.
    pub fn on_context_restored(
        &mut self,
        options: ContextOptions<'_, R::Context>,
    ) -> Result<(), OverlayError> {
        if let Some(mut previous) = self.renderer.take() {
            log::warn!("Context restored while a renderer exists, replacing it");
            previous.dispose();
        }

        let mut renderer = R::create(options.gl).map_err(|e| {
            log::error!("Failed to create renderer: {}", e);
            OverlayError::Renderer(e)
        })?;
        renderer.set_auto_clear(false);

        self.viewport = options.canvas_size;
        self.renderer = Some(renderer);
        log::info!(
            "Renderer ready ({}x{})",
            self.viewport.width,
            self.viewport.height
        );
        Ok(())
    }

    /// Host lifecycle: the graphics context is gone.
    ///
    /// Frames are skipped until the next `on_context_restored`.
    pub fn on_context_lost(&mut self) {
        let Some(mut renderer) = self.renderer.take() else {
            return;
        };
        self.viewport = ViewportSize::ZERO;
        self.redraw_pending.set(false);
        renderer.dispose();
        log::info!("Graphics context lost, renderer released");
    }

    /// Host lifecycle: draw one frame.
    ///
    /// Applies the host's camera matrix, runs the update hook, renders the
    /// scene and restores the host's render state. The restore step runs
    /// even when the update hook fails or panics.
    pub fn on_draw(&mut self, options: DrawOptions<'_>) -> Result<(), OverlayError> {
        if self.renderer.is_none() {
            log::trace!("Skipping frame: no renderer");
            return Ok(());
        }
        if !self.is_attached() {
            log::trace!("Skipping frame: overlay is not on a map");
            return Ok(());
        }

        self.camera
            .set_external_projection(options.transformer.projection_at(&self.reference_point));
        self.viewport = options.canvas_size;
        self.redraw_pending.set(false);

        let Some(renderer) = self.renderer.as_mut() else {
            return Ok(());
        };
        renderer.set_viewport(0, 0, self.viewport.width, self.viewport.height);

        let (outcome, redraw_requested) = match self.hooks.update.as_mut() {
            Some(update) => {
                let mut frame =
                    FrameContext::new(&mut self.scene, self.viewport, self.reference_point);
                let started = Instant::now();
                let outcome = hooks::invoke(HookKind::Update, || update(&mut frame));

                let elapsed = started.elapsed();
                if elapsed > self.frame_budget {
                    log::warn!(
                        "Update hook took {:.1} ms (budget {:.1} ms)",
                        elapsed.as_secs_f64() * 1000.0,
                        self.frame_budget.as_secs_f64() * 1000.0
                    );
                }
                (outcome, frame.redraw_requested())
            }
            None => (HookOutcome::Completed, false),
        };

        let result = match outcome {
            HookOutcome::Completed => renderer.render(&self.scene, &self.camera).map_err(|e| {
                log::error!("Failed to render frame: {}", e);
                OverlayError::Render(e)
            }),
            HookOutcome::Failed(error) => Err(error),
            panicked @ HookOutcome::Panicked(_) => {
                renderer.reset_state();
                return panicked.into_result();
            }
        };
        renderer.reset_state();

        if redraw_requested && result.is_ok() {
            self.request_redraw();
        }
        result
    }
}
