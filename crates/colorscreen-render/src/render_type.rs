/// The closed family of output renderings the pipeline can produce from a
/// single detected screen geometry, from raw diagnostic views through the
/// fully corrected presentation image. Trimmed to the variants with
/// genuinely distinct pixel-sampling behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderType {
    /// The raw scan, geometrically unwarped but otherwise untouched — no
    /// screen geometry involved.
    Original,
    /// `Original` put through the scan's color profile.
    ProfiledOriginal,
    /// `Original` resampled through the detected patch grid rather than
    /// pixel-for-pixel.
    InterpolatedOriginal,
    /// `ProfiledOriginal` resampled through the detected patch grid.
    InterpolatedProfiledOriginal,
    /// Difference between `Original` and `InterpolatedOriginal`, for
    /// judging how much the patch-grid resampling smoothed away.
    InterpolatedDiff,
    /// Per-patch average color, one flat swatch per screen cell — useful
    /// for inspecting detection quality.
    PreviewGrid,
    /// Full photographic reconstruction: superposes the synthesized
    /// screen over the linearized scan, then unmixes, corrects backlight
    /// and scanner blur, and sharpens.
    Realistic,
    /// Primary unmixing sampled from the detected patch grid, without the
    /// full screen-synthesis pass `Realistic` does.
    Interpolated,
    /// Reconstructs a pixel's color from its neighboring patches' fitted
    /// model rather than directly unmixing the sample underneath it.
    Predictive,
    /// `Realistic` blended with `Interpolated` to reduce screen-pattern
    /// aliasing in flat regions while keeping detail elsewhere.
    Combined,
    /// Low-cost approximate reconstruction for interactive panning; skips
    /// the antialiasing and correction passes the other variants apply.
    Fast,
    /// Nearest detected-patch color, sampled directly in screen space —
    /// a calibration/debugging view.
    ScrNearest,
    /// `ScrNearest`, rescaled to the output resolution.
    ScrNearestScaled,
    /// `ScrNearest` after lattice relaxation, showing the effect of the
    /// non-rigid lattice solve on patch placement.
    ScrRelax,
    /// Screen-detector diagnostic: per-pixel color after the detector's
    /// classification-driven adjustment.
    AdjustedColor,
    /// Screen-detector diagnostic: per-pixel color normalized against its
    /// patch's expected color class.
    NormalizedColor,
    /// Screen-detector diagnostic: raw per-pixel classification colors,
    /// unmodified by any patch-level statistic.
    PixelColors,
    /// `Realistic`, sampled and composed directly in screen space instead
    /// of final/image space.
    RealisticScr,
}

impl RenderType {
    /// Render types that require a detected/known screen geometry rather
    /// than just raw scan data.
    pub fn needs_screen_geometry(self) -> bool {
        !matches!(self, RenderType::Original | RenderType::ProfiledOriginal)
    }

    /// Render types whose output benefits from downstream saturation-loss
    /// correction.
    pub fn wants_saturation_correction(self) -> bool {
        matches!(
            self,
            RenderType::Realistic | RenderType::Combined | RenderType::RealisticScr
        )
    }

    /// Screen-detector diagnostic views, grouped together because they
    /// share a sampling path distinct from the reconstruction variants
    /// (mirrors `render_type_first_scr_detect` in the original enum).
    pub fn is_scr_detect_view(self) -> bool {
        matches!(
            self,
            RenderType::AdjustedColor
                | RenderType::NormalizedColor
                | RenderType::PixelColors
                | RenderType::RealisticScr
                | RenderType::ScrNearest
                | RenderType::ScrNearestScaled
                | RenderType::ScrRelax
        )
    }
}
