//! Platform font discovery.
//!
//! The invoice layout needs glyph coverage for the full Polish alphabet,
//! which the PDF builtin fonts do not provide. The resolver probes a
//! fixed list of well-known font file locations and the renderer falls
//! back to the builtin monospace when nothing is found. No other part
//! of the crate hard-codes absolute font paths.

use std::path::PathBuf;

/// A regular/bold pair of TrueType files.
#[derive(Debug, Clone)]
pub struct FontCandidate {
    pub regular: PathBuf,
    pub bold: PathBuf,
}

/// Probes candidate font pairs in order; first hit wins.
#[derive(Debug, Clone)]
pub struct FontResolver {
    candidates: Vec<FontCandidate>,
}

impl FontResolver {
    /// DejaVu Sans and Liberation Sans on Linux, Arial on macOS and
    /// Windows; all cover Polish diacritics.
    pub fn with_platform_defaults() -> Self {
        let pairs = [
            (
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            ),
            (
                "/usr/share/fonts/TTF/DejaVuSans.ttf",
                "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
            ),
            (
                "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
                "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
            ),
            (
                "/System/Library/Fonts/Supplemental/Arial.ttf",
                "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
            ),
            (
                "C:\\Windows\\Fonts\\arial.ttf",
                "C:\\Windows\\Fonts\\arialbd.ttf",
            ),
        ];
        Self {
            candidates: pairs
                .into_iter()
                .map(|(regular, bold)| FontCandidate {
                    regular: PathBuf::from(regular),
                    bold: PathBuf::from(bold),
                })
                .collect(),
        }
    }

    /// Resolver with an explicit candidate list, probed in order.
    pub fn with_candidates(candidates: Vec<FontCandidate>) -> Self {
        Self { candidates }
    }

    /// First candidate whose regular and bold files both exist.
    pub fn resolve(&self) -> Option<&FontCandidate> {
        self.candidates
            .iter()
            .find(|c| c.regular.is_file() && c.bold.is_file())
    }
}

impl Default for FontResolver {
    fn default() -> Self {
        Self::with_platform_defaults()
    }
}
