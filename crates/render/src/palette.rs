//! Category colors for detection overlays.

use vigia_core::Detection;

pub type Rgba = [u8; 4];

/// Stroke, label-background, and label-text colors for one detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub stroke: Rgba,
    /// Label chip background; drawn at 80% opacity.
    pub fill: Rgba,
    pub text: Rgba,
}

const FILL_ALPHA: u8 = 204; // 0.8

const fn scheme(stroke: [u8; 3], text: [u8; 3]) -> ColorScheme {
    ColorScheme {
        stroke: [stroke[0], stroke[1], stroke[2], 255],
        fill: [stroke[0], stroke[1], stroke[2], FILL_ALPHA],
        text: [text[0], text[1], text[2], 255],
    }
}

const BLACK: [u8; 3] = [0x00, 0x00, 0x00];
const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];

pub const INFRACTION: ColorScheme = scheme([0xFF, 0x00, 0x00], WHITE);
pub const CAR: ColorScheme = scheme([0x00, 0xFF, 0x00], BLACK);
pub const TRUCK: ColorScheme = scheme([0xFF, 0x98, 0x00], BLACK);
pub const BUS: ColorScheme = scheme([0x21, 0x96, 0xF3], WHITE);
pub const MOTORCYCLE: ColorScheme = scheme([0x9C, 0x27, 0xB0], WHITE);
pub const BICYCLE: ColorScheme = scheme([0xFF, 0xEB, 0x3B], BLACK);
pub const PERSON: ColorScheme = scheme([0xFF, 0x57, 0x22], WHITE);

/// Pick the color scheme for a detection. Any infraction overrides
/// the category color with red; unknown categories fall back to the
/// car scheme.
pub fn color_for(detection: &Detection) -> ColorScheme {
    if detection.is_infraction() {
        return INFRACTION;
    }
    let kind = detection
        .vehicle_type
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "car".to_string());
    match kind.as_str() {
        "truck" => TRUCK,
        "bus" => BUS,
        "motorcycle" => MOTORCYCLE,
        "bicycle" => BICYCLE,
        "person" => PERSON,
        _ => CAR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigia_core::{BoundingBox, Detection};

    fn detection(vehicle_type: Option<&str>) -> Detection {
        Detection {
            bbox: BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
            confidence: 0.9,
            vehicle_type: vehicle_type.map(str::to_string),
            license_plate: None,
            speed: None,
            infraction_type: None,
            has_infraction: false,
        }
    }

    #[test]
    fn categories_map_to_their_colors() {
        assert_eq!(color_for(&detection(Some("car"))).stroke, [0, 255, 0, 255]);
        assert_eq!(
            color_for(&detection(Some("truck"))).stroke,
            [0xFF, 0x98, 0x00, 255]
        );
        assert_eq!(
            color_for(&detection(Some("bus"))).stroke,
            [0x21, 0x96, 0xF3, 255]
        );
    }

    #[test]
    fn category_match_is_case_insensitive() {
        assert_eq!(color_for(&detection(Some("Bus"))).stroke, BUS.stroke);
    }

    #[test]
    fn unknown_or_missing_category_falls_back_to_car() {
        assert_eq!(color_for(&detection(Some("tram"))).stroke, CAR.stroke);
        assert_eq!(color_for(&detection(None)).stroke, CAR.stroke);
    }

    #[test]
    fn infraction_overrides_category_color() {
        let mut det = detection(Some("bus"));
        det.infraction_type = Some("speeding".to_string());
        assert_eq!(color_for(&det), INFRACTION);
    }
}
