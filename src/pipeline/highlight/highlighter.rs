use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use super::classifier::ColorMatcher;
use super::overlay::{render_overlay, resample, OverlayFrame};
use super::surface::{BlendMode, SharedSurface, Surface};
use crate::common::{DominantColor, ImageLoader, ImageSource};
use crate::config::HighlightConfig;
use crate::error::{HighlightError, SurfaceError};

/// One highlight invocation: which photo, which color, at what size.
#[derive(Debug, Clone)]
pub struct HighlightRequest {
    pub id: Uuid,
    pub source: Option<ImageSource>,
    pub color: Option<DominantColor>,
    pub visible: bool,
    /// Rendered size of the displayed photo at call time.
    pub output_width: u32,
    pub output_height: u32,
}

impl HighlightRequest {
    pub fn new(
        source: impl Into<Option<ImageSource>>,
        color: impl Into<Option<DominantColor>>,
        output_width: u32,
        output_height: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            color: color.into(),
            visible: true,
            output_width,
            output_height,
        }
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ClearReason {
    Hidden,
    NoColor,
    NoImage,
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct HighlightReport {
    pub request_id: Uuid,
    pub width: u32,
    pub height: u32,
    pub matched_pixels: usize,
    pub total_pixels: usize,
    pub coverage: f32,
    pub color: DominantColor,
    pub caption: String,
    pub rendered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub enum HighlightOutcome {
    Drawn(HighlightReport),
    Cleared(ClearReason),
    /// The surface was not mounted, nothing happened.
    Skipped,
    /// A newer request started before this one could draw.
    Superseded,
}

impl HighlightOutcome {
    pub fn report(&self) -> Option<&HighlightReport> {
        match self {
            HighlightOutcome::Drawn(report) => Some(report),
            _ => None,
        }
    }
}

/// What the viewer shows next to the overlay while it works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightStatus {
    Idle,
    Processing { hex: String },
    Ready { caption: String },
    Cleared,
}

impl HighlightStatus {
    pub fn display_text(&self) -> String {
        match self {
            HighlightStatus::Idle | HighlightStatus::Cleared => String::new(),
            HighlightStatus::Processing { hex } => format!("Highlighting {}...", hex),
            HighlightStatus::Ready { caption } => caption.clone(),
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, HighlightStatus::Processing { .. })
    }
}

/// Draws color highlight overlays onto a surface.
///
/// Every call supersedes the previous one: the older call's scan is
/// cancelled, and an older frame is never composited over a newer one.
pub struct ColorHighlighter {
    loader: Arc<dyn ImageLoader>,
    config: HighlightConfig,
    generation: AtomicU64,
    in_flight: Mutex<CancellationToken>,
    status: watch::Sender<HighlightStatus>,
}

impl ColorHighlighter {
    pub fn new(loader: Arc<dyn ImageLoader>, config: HighlightConfig) -> Self {
        let (status, _) = watch::channel(HighlightStatus::Idle);
        Self {
            loader,
            config,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(CancellationToken::new()),
            status,
        }
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<HighlightStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> HighlightStatus {
        self.status.borrow().clone()
    }

    /// Cancel whatever is running and clear the surface. The cancelled call
    /// returns `Superseded`.
    pub fn cancel_in_flight<S: Surface>(&self, surface: &SharedSurface<S>) -> HighlightOutcome {
        let (generation, _) = self.begin();
        debug!("Cancelling in-flight highlight");
        self.clear_surface(generation, surface, ClearReason::Cancelled)
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.cancel();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        *in_flight = cancel.clone();
        (generation, cancel)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn publish(&self, generation: u64, status: HighlightStatus) {
        // same lock as begin, so a stale call can't overwrite a newer status
        let _in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_current(generation) {
            self.status.send_replace(status);
        }
    }

    #[instrument(skip(self, request, surface), fields(request_id = %request.id))]
    pub async fn highlight<S: Surface>(
        &self,
        request: HighlightRequest,
        surface: &SharedSurface<S>,
    ) -> HighlightOutcome {
        let (generation, cancel) = self.begin();

        match self.run(&request, generation, &cancel, surface).await {
            Ok(outcome) => outcome,
            Err(HighlightError::Cancelled) => {
                debug!("Request {} superseded", request.id);
                HighlightOutcome::Superseded
            }
            Err(HighlightError::Surface(SurfaceError::Unmounted)) => {
                debug!("Surface unmounted while drawing, skipping");
                self.publish(generation, HighlightStatus::Idle);
                HighlightOutcome::Skipped
            }
            Err(e) => {
                error!("Highlight {} failed: {}", request.id, e);
                self.clear_surface(generation, surface, ClearReason::Failed(e.to_string()))
            }
        }
    }

    async fn run<S: Surface>(
        &self,
        request: &HighlightRequest,
        generation: u64,
        cancel: &CancellationToken,
        surface: &SharedSurface<S>,
    ) -> Result<HighlightOutcome, HighlightError> {
        if !request.visible {
            return Ok(self.clear_surface(generation, surface, ClearReason::Hidden));
        }
        let Some(color) = request.color.as_ref() else {
            return Ok(self.clear_surface(generation, surface, ClearReason::NoColor));
        };
        let Some(source) = request.source.as_ref() else {
            return Ok(self.clear_surface(generation, surface, ClearReason::NoImage));
        };

        let (width, height) = (request.output_width, request.output_height);
        if width == 0 || height == 0 {
            return Err(HighlightError::InvalidDimensions(width, height));
        }

        let mounted = surface
            .lock()
            .map_err(|_| SurfaceError::Poisoned)?
            .is_mounted();
        if !mounted {
            debug!("Surface not mounted, nothing to draw");
            return Ok(HighlightOutcome::Skipped);
        }

        self.publish(
            generation,
            HighlightStatus::Processing {
                hex: color.hex.clone(),
            },
        );

        let image = self.loader.load(source).await?;
        if cancel.is_cancelled() {
            return Err(HighlightError::Cancelled);
        }
        debug!(
            "Loaded {} ({}x{}), resampling to {}x{}",
            source.describe(),
            image.width(),
            image.height(),
            width,
            height
        );

        let config = self.config.clone();
        let matcher = ColorMatcher::new(color.as_rgb(), config.tolerance);
        let token = cancel.clone();
        let frame = tokio::task::spawn_blocking(move || {
            let resampled = resample(&image, width, height, config.resample_filter.into());
            render_overlay(&resampled, &matcher, &config, &token)
        })
        .await
        .map_err(|e| HighlightError::Task(e.to_string()))??;

        self.draw(generation, &frame, surface)?;

        let report = HighlightReport {
            request_id: request.id,
            width,
            height,
            matched_pixels: frame.mask.matched_pixels(),
            total_pixels: frame.mask.total_pixels(),
            coverage: frame.mask.coverage(),
            color: color.clone(),
            caption: color.caption(),
            rendered_at: Utc::now(),
        };
        info!(
            "Highlighted {} over {}x{}: {}/{} pixels matched",
            color.hex, width, height, report.matched_pixels, report.total_pixels
        );
        self.publish(
            generation,
            HighlightStatus::Ready {
                caption: report.caption.clone(),
            },
        );
        Ok(HighlightOutcome::Drawn(report))
    }

    fn draw<S: Surface>(
        &self,
        generation: u64,
        frame: &OverlayFrame,
        surface: &SharedSurface<S>,
    ) -> Result<(), HighlightError> {
        let mut surface = surface.lock().map_err(|_| SurfaceError::Poisoned)?;
        // checked under the surface lock so a newer request can't be painted over
        if !self.is_current(generation) {
            return Err(HighlightError::Cancelled);
        }
        let (width, height) = frame.dimensions();
        surface.resize(width, height)?;
        surface.clear();
        surface.composite(&frame.mask_layer, BlendMode::Overlay)?;
        if let Some(border) = frame.border_layer.as_ref() {
            surface.composite(border, BlendMode::Normal)?;
        }
        Ok(())
    }

    /// Clears the surface unless a newer request already owns it.
    fn clear_surface<S: Surface>(
        &self,
        generation: u64,
        surface: &SharedSurface<S>,
        reason: ClearReason,
    ) -> HighlightOutcome {
        let mut surface = surface.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(generation) {
            return HighlightOutcome::Superseded;
        }
        surface.clear();
        self.publish(generation, HighlightStatus::Cleared);
        HighlightOutcome::Cleared(reason)
    }
}
