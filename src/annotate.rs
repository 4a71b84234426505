//! Bounding-box annotation for alert snapshots.

use crate::detect::Region;
use crate::frame::Frame;

const BOX_COLOR: [u8; 3] = [0, 255, 0];
const BOX_THICKNESS: u32 = 2;

/// Draw a rectangle border for every region onto the frame. Coordinates
/// outside the frame are clipped by `Frame::set_pixel`.
pub fn draw_regions(frame: &mut Frame, regions: &[Region]) {
    for region in regions {
        for t in 0..BOX_THICKNESS {
            let x0 = region.x.saturating_sub(t);
            let y0 = region.y.saturating_sub(t);
            let x1 = region.x + region.width + t;
            let y1 = region.y + region.height + t;
            for x in x0..=x1 {
                frame.set_pixel(x, y0, BOX_COLOR);
                frame.set_pixel(x, y1, BOX_COLOR);
            }
            for y in y0..=y1 {
                frame.set_pixel(x0, y, BOX_COLOR);
                frame.set_pixel(x1, y, BOX_COLOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_border_without_touching_interior() {
        let mut frame = Frame::new(vec![0u8; 32 * 32 * 3], 32, 32).unwrap();
        let region = Region {
            x: 8,
            y: 8,
            width: 10,
            height: 10,
        };
        draw_regions(&mut frame, &[region]);

        // Top-left corner of the border is painted.
        let idx = (8 * 32 + 8) * 3;
        assert_eq!(&frame.pixels()[idx..idx + 3], &BOX_COLOR);

        // Center of the region stays untouched.
        let idx = (13 * 32 + 13) * 3;
        assert_eq!(&frame.pixels()[idx..idx + 3], &[0, 0, 0]);
    }

    #[test]
    fn clips_regions_at_frame_edge() {
        let mut frame = Frame::new(vec![0u8; 16 * 16 * 3], 16, 16).unwrap();
        let region = Region {
            x: 12,
            y: 12,
            width: 10,
            height: 10,
        };
        // Must not panic even though the box extends past the frame.
        draw_regions(&mut frame, &[region]);
    }
}
