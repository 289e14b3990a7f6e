/// The family of additive color-screen mosaics this toolkit knows how to
/// synthesize and detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenType {
    /// No regular pattern; used for the identity/neutral screen tile.
    Random,
    Dufay,
    Paget,
    Finlay,
    Thames,
    DioptichromeB,
    ImprovedDioptichromeB,
    Omnicolore,
    WarnerPowrie,
    Joly,
}

impl ScreenType {
    /// The screens built from three parallel color strips rather than a
    /// two-dimensional lattice (Dufay is also strip-based but has its own
    /// asymmetric red/green width convention, so it is kept separate).
    pub fn is_parallel_strip(self) -> bool {
        matches!(
            self,
            ScreenType::Joly
                | ScreenType::WarnerPowrie
                | ScreenType::Omnicolore
                | ScreenType::DioptichromeB
                | ScreenType::ImprovedDioptichromeB
        )
    }

    pub fn is_diagonal_lattice(self) -> bool {
        matches!(self, ScreenType::Paget | ScreenType::Finlay)
    }
}

/// How the scanner produced the raw capture, which determines whether a
/// motor-correction 1D function is meaningful for this scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerType {
    FixedLens,
    LensMovesX,
    LensMovesY,
}

/// The three additive primaries a screen patch is classified into during
/// detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorClass {
    Red,
    Green,
    Blue,
}
