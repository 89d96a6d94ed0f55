//! The studio session: one owned state object that every host command and
//! pointer event funnels through, advanced by a single frame loop.

mod commands;
mod timing;

pub use commands::{CommandOutcome, StudioCommand, MAX_SCRIPT_ADVANCE, SCRIPT_FRAME_DT};
pub use timing::{FrameClock, MAX_FRAME_DT};

use crate::assets::{
    AssetError, AssetFetcher, FileFetcher, GarmentAsset, GarmentLoader, LoadOutcome, LoadState,
};
use crate::color::HexColor;
use crate::config::StudioConfig;
use crate::render::{
    asset_targets, build_render_list, pick_decal, project, Camera, DecalInstance, Ray,
    RotateDirection, SurfaceHit, ViewRig,
};
use crate::scene::serialization::DesignDocument;
use crate::scene::{DesignState, ElementId};
use crate::texture::{
    load_glyphs, BitmapId, BitmapRegistry, DecodeQueue, GlyphRasterizer, ImageSource,
    TextureSynthesizer,
};
use crate::ui::{StatusEvent, StatusFeed};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Studio {
    config: StudioConfig,
    camera: Camera,
    rig: ViewRig,
    loader: GarmentLoader,
    decodes: DecodeQueue,
    pending_decodes: HashSet<u64>,
    bitmaps: BitmapRegistry,
    synth: TextureSynthesizer,
    selection_bitmap: BitmapId,
    design: DesignState,
    asset: Option<GarmentAsset>,
    garment_type: String,
    garment_color: HexColor,
    background: HexColor,
    status: StatusFeed,
    clock: FrameClock,
}

impl Studio {
    /// Session reading assets from `asset_root` and text glyphs from the
    /// configured or system font.
    pub fn new(config: StudioConfig) -> Self {
        let fetcher = Arc::new(FileFetcher::new(config.asset_root.clone()));
        let glyphs = load_glyphs(config.font_path.as_deref());
        Self::with_parts(config, fetcher, glyphs)
    }

    /// Starts loading the default garment right away.
    pub fn with_parts(
        config: StudioConfig,
        fetcher: Arc<dyn AssetFetcher>,
        glyphs: Box<dyn GlyphRasterizer>,
    ) -> Self {
        let camera = Camera::new(&config.camera, &config.viewport);
        let synth = TextureSynthesizer::new(glyphs);
        let mut bitmaps = BitmapRegistry::new();
        let selection_bitmap = bitmaps.insert(synth.render_selection_indicator());
        let garment_type = config.resolve_garment(&config.default_garment).to_string();
        let mut studio = Self {
            rig: ViewRig::new(config.easing_time_constant),
            loader: GarmentLoader::new(fetcher),
            decodes: DecodeQueue::new(),
            pending_decodes: HashSet::new(),
            bitmaps,
            synth,
            selection_bitmap,
            design: DesignState::new(),
            asset: None,
            garment_type: String::new(),
            garment_color: config.garment_color,
            background: config.background,
            status: StatusFeed::new(),
            clock: FrameClock::new(),
            camera,
            config,
        };
        log::info!(
            "Studio ready ({}x{}, glyphs: {})",
            studio.camera.viewport[0],
            studio.camera.viewport[1],
            studio.synth.glyph_source()
        );
        studio.set_garment_type(&garment_type);
        studio
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn rig(&self) -> &ViewRig {
        &self.rig
    }

    pub fn design(&self) -> &DesignState {
        &self.design
    }

    pub fn asset(&self) -> Option<&GarmentAsset> {
        self.asset.as_ref()
    }

    pub fn bitmaps(&self) -> &BitmapRegistry {
        &self.bitmaps
    }

    pub fn status(&self) -> &StatusFeed {
        &self.status
    }

    pub fn status_mut(&mut self) -> &mut StatusFeed {
        &mut self.status
    }

    pub fn garment_type(&self) -> &str {
        &self.garment_type
    }

    pub fn garment_color(&self) -> HexColor {
        self.garment_color
    }

    pub fn load_state(&self) -> LoadState {
        self.loader.state()
    }

    pub fn add_text(&mut self, text: &str) -> ElementId {
        self.design
            .add_text(text, &self.synth, &mut self.bitmaps, self.asset.as_ref())
    }

    /// Decode `source` in the background; the element appears (and is
    /// selected) on the frame the decode lands.
    pub fn add_image(&mut self, source: &str) -> u64 {
        let ticket = self.decodes.submit(ImageSource::parse(source));
        self.pending_decodes.insert(ticket);
        log::debug!("Image decode {} queued", ticket);
        ticket
    }

    /// Swap garments. Elements lose their anchors until the new asset lands.
    /// Unknown types fall back to the default garment.
    pub fn set_garment_type(&mut self, requested: &str) -> bool {
        let garment = self.config.resolve_garment(requested).to_string();
        if garment == self.garment_type {
            log::debug!("Garment '{}' already active", garment);
            return false;
        }
        self.design.orphan_all();
        self.asset = None;
        self.garment_type = garment.clone();

        let Some(path) = self.config.garment_path(&garment).map(str::to_string) else {
            let err = AssetError::UnknownGarment(garment.clone());
            self.install_placeholder(&garment, "", &err);
            return true;
        };
        self.loader.request(&garment, &path);
        self.status.push(StatusEvent::Loading { garment, path });
        true
    }

    pub fn set_garment_color(&mut self, color: HexColor) {
        self.garment_color = color;
        if let Some(asset) = self.asset.as_mut() {
            asset.set_target_color(color);
        }
    }

    pub fn set_selected_text(&mut self, text: &str) -> bool {
        self.design
            .set_selected_text(text, &self.synth, &mut self.bitmaps)
    }

    pub fn set_selected_color(&mut self, color: HexColor) -> bool {
        self.design
            .set_selected_color(color, &self.synth, &mut self.bitmaps)
    }

    pub fn move_selected(&mut self, dx: f32, dy: f32) -> bool {
        self.design.move_selected(dx, dy)
    }

    pub fn scale_selected(&mut self, factor: f32) -> bool {
        self.design.scale_selected(factor)
    }

    pub fn delete_selected(&mut self) -> bool {
        self.design.remove_selected(&mut self.bitmaps).is_some()
    }

    pub fn select(&mut self, id: &ElementId) -> bool {
        self.design.select(id)
    }

    pub fn clear_selection(&mut self) {
        self.design.clear_selection();
    }

    /// Text elements only; images are not part of the document.
    pub fn export_design(&self) -> DesignDocument {
        DesignDocument::capture(
            &self.garment_type,
            self.garment_color,
            self.background,
            &self.design,
        )
    }

    /// Replace the session's garment, colours and elements with `document`.
    pub fn import_design(&mut self, document: &DesignDocument) -> bool {
        if let Err(err) = document.check_version() {
            log::warn!("Design import rejected: {}", err);
            return false;
        }
        self.set_garment_type(&document.garment_type);
        self.set_garment_color(document.garment_color);
        self.background = document.background;
        let count = self.design.import_text(
            document.text_seeds(),
            &self.synth,
            &mut self.bitmaps,
            self.asset.as_ref(),
        );
        log::info!("Imported {} text elements", count);
        true
    }

    fn pointer_ray(&self, x: f32, y: f32) -> Option<Ray> {
        (x.is_finite() && y.is_finite()).then(|| self.camera.screen_to_ray(x, y))
    }

    fn garment_hit(&self, ray: &Ray) -> Option<SurfaceHit> {
        let asset = self.asset.as_ref()?;
        project(ray, asset_targets(asset, self.rig.angle()))
    }

    /// Select and arm a drag on the decal under the pointer. A pointer that
    /// misses every decal and the garment clears the selection.
    pub fn pointer_down(&mut self, x: f32, y: f32) -> Option<ElementId> {
        let ray = self.pointer_ray(x, y)?;
        let surface = self.garment_hit(&ray);
        let decal = pick_decal(&ray, &self.render_list()).filter(|(_, distance)| {
            surface
                .as_ref()
                .map_or(true, |hit| *distance <= hit.distance)
        });
        match decal {
            Some((id, _)) => {
                self.design.select(&id);
                self.design.arm_drag(&id);
                Some(id)
            }
            None => {
                if surface.is_none() {
                    self.pointer_missed();
                }
                None
            }
        }
    }

    /// Re-project the dragged element. Returns whether it moved.
    pub fn pointer_move(&mut self, x: f32, y: f32) -> bool {
        if self.design.dragging().is_none() {
            return false;
        }
        let hit = self
            .pointer_ray(x, y)
            .and_then(|ray| self.garment_hit(&ray));
        self.design.drag_to(hit)
    }

    pub fn pointer_up(&mut self) {
        self.design.disarm_drag();
    }

    pub fn pointer_leave(&mut self) {
        self.design.disarm_drag();
    }

    pub fn pointer_missed(&mut self) {
        self.design.disarm_drag();
        self.design.clear_selection();
    }

    pub fn rotate_tap(&mut self, direction: RotateDirection) {
        self.rig.tap(direction);
    }

    pub fn rotate_hold(&mut self, direction: RotateDirection) {
        self.rig.begin_hold(direction);
    }

    pub fn rotate_release(&mut self) {
        self.rig.end_hold();
    }

    pub fn rotate_reset(&mut self) {
        self.rig.reset();
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            log::debug!("Ignoring empty viewport {}x{}", width, height);
            return false;
        }
        self.camera.viewport = [width, height];
        self.refit();
        true
    }

    pub fn set_camera_fov(&mut self, fov_deg: f32) -> bool {
        if !fov_deg.is_finite() || fov_deg <= 0.0 || fov_deg >= 180.0 {
            log::debug!("Ignoring field of view {}", fov_deg);
            return false;
        }
        self.camera.fov_y_deg = fov_deg;
        self.refit();
        true
    }

    pub fn set_camera_distance(&mut self, distance: f32) -> bool {
        if !distance.is_finite() || distance <= self.camera.near {
            log::debug!("Ignoring camera distance {}", distance);
            return false;
        }
        self.camera.position.z = distance;
        self.refit();
        true
    }

    fn refit(&mut self) {
        let inputs = self.camera.fit_inputs();
        let Some(asset) = self.asset.as_mut() else {
            return;
        };
        if asset.is_placeholder() {
            return;
        }
        asset.refit(&inputs, &self.config.fit);
        self.status.push(StatusEvent::Loaded {
            garment: asset.garment().to_string(),
            path: asset.source().to_string(),
            scaled_bounds: asset.scaled_size(),
        });
    }

    /// Advance one frame by the wall clock.
    pub fn frame(&mut self, now: Instant) {
        let dt = self.clock.update(now);
        self.tick(dt);
    }

    /// Land finished background work, then ease the rig and garment colour.
    /// `dt` is clamped to one long frame.
    pub fn tick(&mut self, dt: f32) {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
        if let Some(outcome) = self.loader.poll() {
            self.land_garment(outcome);
        }
        for (ticket, result) in self.decodes.poll() {
            if !self.pending_decodes.remove(&ticket) {
                continue;
            }
            match result {
                Ok(decoded) => {
                    self.design
                        .add_image(&decoded, &mut self.bitmaps, self.asset.as_ref());
                }
                Err(err) => {
                    log::warn!("Image decode {} failed: {}", ticket, err);
                    self.status.push(StatusEvent::DecodeFailed {
                        error: err.to_string(),
                    });
                }
            }
        }
        self.rig.tick(dt);
        if let Some(asset) = self.asset.as_mut() {
            asset.tick_colors(self.config.easing_time_constant, dt);
        }
    }

    fn land_garment(&mut self, outcome: LoadOutcome) {
        let LoadOutcome { request, result } = outcome;
        if request.garment != self.garment_type {
            log::debug!("Ignoring load of '{}' for inactive garment", request.garment);
            return;
        }
        match result {
            Ok(parsed) => {
                let asset = GarmentAsset::instantiate(
                    &request.garment,
                    &parsed,
                    self.garment_color,
                    &self.camera.fit_inputs(),
                    &self.config.fit,
                );
                log::info!(
                    "Garment '{}' recentered from {:?}, fit scale {:.3}",
                    request.garment,
                    asset.source_center(),
                    asset.fit_scale()
                );
                self.status.push(StatusEvent::Loaded {
                    garment: request.garment,
                    path: request.path,
                    scaled_bounds: asset.scaled_size(),
                });
                self.install(asset);
            }
            Err(err) => self.install_placeholder(&request.garment, &request.path, &err),
        }
    }

    fn install_placeholder(&mut self, garment: &str, path: &str, err: &AssetError) {
        log::warn!("Garment '{}' failed to load: {}", garment, err);
        self.status.push(StatusEvent::Failed {
            garment: garment.to_string(),
            path: path.to_string(),
            error: err.to_string(),
        });
        self.install(GarmentAsset::placeholder(garment, path, self.garment_color));
    }

    fn install(&mut self, asset: GarmentAsset) {
        let asset = self.asset.insert(asset);
        let dropped = self
            .design
            .adopt(asset, self.config.orphan_policy, &mut self.bitmaps);
        if dropped > 0 {
            log::info!("Dropped {} orphaned elements", dropped);
        }
    }

    /// Decals to draw this frame, selection indicator last.
    pub fn render_list(&self) -> Vec<DecalInstance> {
        match &self.asset {
            Some(asset) => build_render_list(
                &self.design,
                asset,
                self.rig.angle(),
                Some(self.selection_bitmap),
            ),
            None => Vec::new(),
        }
    }

    /// No garment load or image decode outstanding.
    pub fn is_idle(&self) -> bool {
        self.loader.in_flight() == 0 && self.pending_decodes.is_empty()
    }

    /// Pump fixed frames until background work settles or `timeout` passes.
    pub fn block_until_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.tick(SCRIPT_FRAME_DT);
            if self.is_idle() {
                return true;
            }
            if Instant::now() >= deadline {
                log::warn!("Background work still pending after {:?}", timeout);
                return false;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.design.clear(&mut self.bitmaps);
        self.bitmaps.release(self.selection_bitmap);
        log::debug!(
            "Studio closed with {} live bitmaps",
            self.bitmaps.live_count()
        );
    }
}
