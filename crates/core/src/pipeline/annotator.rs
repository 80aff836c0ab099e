use crate::recognition::domain::detection::Detection;
use crate::shared::frame::{Frame, CHANNELS};
use crate::shared::region::FaceRegion;

pub const MATCHED_COLOR: [u8; 3] = [0, 255, 0];
pub const UNMATCHED_COLOR: [u8; 3] = [255, 0, 0];

const BORDER_THICKNESS: i32 = 2;
const LABEL_BAND_HEIGHT: i32 = 30;

/// Draws detection boxes onto a copy of a frame.
///
/// Matched faces get a green box, unknown faces a red one, each with a
/// filled band above for the label area. The input frame is never touched;
/// the display copy is the return value.
pub fn annotate(frame: &Frame, detections: &[Detection]) -> Frame {
    let mut display = frame.clone();
    for detection in detections {
        let color = if detection.is_match() {
            MATCHED_COLOR
        } else {
            UNMATCHED_COLOR
        };
        draw_box(&mut display, &detection.region, color);
        draw_label_band(&mut display, &detection.region, color);
    }
    display
}

fn draw_box(frame: &mut Frame, region: &FaceRegion, color: [u8; 3]) {
    let t = BORDER_THICKNESS;
    fill_rect(frame, region.x, region.y, region.width, t, color);
    fill_rect(
        frame,
        region.x,
        region.y + region.height - t,
        region.width,
        t,
        color,
    );
    fill_rect(frame, region.x, region.y, t, region.height, color);
    fill_rect(
        frame,
        region.x + region.width - t,
        region.y,
        t,
        region.height,
        color,
    );
}

fn draw_label_band(frame: &mut Frame, region: &FaceRegion, color: [u8; 3]) {
    fill_rect(
        frame,
        region.x,
        region.y - LABEL_BAND_HEIGHT,
        region.width,
        LABEL_BAND_HEIGHT,
        color,
    );
}

fn fill_rect(frame: &mut Frame, x: i32, y: i32, width: i32, height: i32, color: [u8; 3]) {
    let Some(visible) = FaceRegion::new(x, y, width, height).clamped(frame.width(), frame.height())
    else {
        return;
    };
    let frame_width = frame.width() as usize;
    let data = frame.data_mut();
    for row in visible.y..visible.y + visible.height {
        for col in visible.x..visible.x + visible.width {
            let offset = (row as usize * frame_width + col as usize) * CHANNELS;
            data[offset..offset + CHANNELS].copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![128u8; (width * height * 3) as usize], width, height)
    }

    fn detection(student_id: Option<i64>, region: FaceRegion) -> Detection {
        Detection {
            student_id,
            display_name: "x".into(),
            confidence: 0.5,
            region,
            timestamp: Local::now(),
        }
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let offset = ((y * frame.width() + x) * 3) as usize;
        let d = frame.data();
        [d[offset], d[offset + 1], d[offset + 2]]
    }

    #[test]
    fn test_preserves_dimensions() {
        let input = frame(64, 48);
        let output = annotate(&input, &[detection(Some(1), FaceRegion::new(5, 35, 20, 10))]);
        assert_eq!(output.width(), 64);
        assert_eq!(output.height(), 48);
    }

    #[test]
    fn test_never_mutates_input() {
        let input = frame(64, 48);
        let pristine = input.clone();
        let _ = annotate(&input, &[detection(Some(1), FaceRegion::new(5, 35, 20, 10))]);
        assert_eq!(input, pristine);
    }

    #[test]
    fn test_no_detections_returns_plain_copy() {
        let input = frame(32, 32);
        let output = annotate(&input, &[]);
        assert_eq!(output, input);
    }

    #[test]
    fn test_matched_box_is_green() {
        let input = frame(64, 64);
        let region = FaceRegion::new(10, 40, 20, 20);
        let output = annotate(&input, &[detection(Some(1), region)]);
        assert_eq!(pixel(&output, 10, 40), MATCHED_COLOR);
        // Box interior is untouched.
        assert_eq!(pixel(&output, 20, 50), [128, 128, 128]);
    }

    #[test]
    fn test_unmatched_box_is_red() {
        let input = frame(64, 64);
        let region = FaceRegion::new(10, 40, 20, 20);
        let output = annotate(&input, &[detection(None, region)]);
        assert_eq!(pixel(&output, 10, 40), UNMATCHED_COLOR);
    }

    #[test]
    fn test_label_band_sits_above_box() {
        let input = frame(64, 64);
        let region = FaceRegion::new(10, 40, 20, 20);
        let output = annotate(&input, &[detection(Some(1), region)]);
        assert_eq!(pixel(&output, 15, 39), MATCHED_COLOR);
        assert_eq!(pixel(&output, 15, 11), MATCHED_COLOR);
        assert_eq!(pixel(&output, 15, 9), [128, 128, 128]);
    }

    #[test]
    fn test_offscreen_regions_are_safe() {
        let input = frame(32, 32);
        let outside = detection(Some(1), FaceRegion::new(100, 100, 20, 20));
        let overhanging = detection(None, FaceRegion::new(-10, -10, 25, 25));
        let output = annotate(&input, &[outside, overhanging]);
        assert_eq!(output.width(), 32);
        // The overhanging box still paints its visible part.
        assert_eq!(pixel(&output, 0, 0), UNMATCHED_COLOR);
    }
}
