use colorscreen_core::ColorClass;

/// Classifies a linear RGB sample into the additive primary it most
/// likely belongs to, by picking the channel with the greatest share of
/// the pixel's total energy. This is deliberately simple — screen
/// detection corrects misclassifications downstream via the flood-fill
/// confirmation step's majority-color check, rather than trying to get
/// every pixel right here.
pub fn classify_color(rgb: [f64; 3]) -> ColorClass {
    let [r, g, b] = rgb;
    if r >= g && r >= b {
        ColorClass::Red
    } else if g >= r && g >= b {
        ColorClass::Green
    } else {
        ColorClass::Blue
    }
}

/// A confidence score in `[0, 1]`: how dominant the winning channel is
/// over the runner-up, used to weight a patch's contribution to the
/// detector's quality gates.
pub fn classification_confidence(rgb: [f64; 3]) -> f64 {
    let mut sorted = rgb;
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
    let total = sorted.iter().sum::<f64>().max(1e-9);
    (sorted[0] - sorted[1]).abs() / total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_dominant_channel() {
        assert_eq!(classify_color([0.8, 0.1, 0.1]), ColorClass::Red);
        assert_eq!(classify_color([0.1, 0.8, 0.1]), ColorClass::Green);
        assert_eq!(classify_color([0.1, 0.1, 0.8]), ColorClass::Blue);
    }

    #[test]
    fn confidence_is_zero_for_a_tie() {
        assert!(classification_confidence([0.5, 0.5, 0.0]) < 1e-9);
    }
}
