use hourglass_sand::bitmap::FrameView;

/// Braille character rendering for high-resolution terminal graphics.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// A single rendered Braille cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
}

/// Frame size in display pixels. Portrait swaps the axes so the gravity
/// axis runs down the terminal.
fn display_size(frame: &FrameView, portrait: bool) -> (usize, usize) {
    if portrait {
        (frame.height(), frame.width())
    } else {
        (frame.width(), frame.height())
    }
}

fn display_pixel(frame: &FrameView, x: usize, y: usize, portrait: bool) -> bool {
    if portrait {
        frame.get(x, y)
    } else {
        frame.get(y, x)
    }
}

/// Character cells needed to show the frame at one pixel per dot
pub fn native_size(frame: &FrameView, portrait: bool) -> (u16, u16) {
    let (width, height) = display_size(frame, portrait);
    (
        width.div_ceil(2).min(u16::MAX as usize) as u16,
        height.div_ceil(4).min(u16::MAX as usize) as u16,
    )
}

/// Render a frame to Braille characters, centred in the canvas.
///
/// Frames larger than the canvas are downsampled; a dot is set when any
/// source pixel it covers is set, so single grains never vanish. Smaller
/// frames are drawn at one pixel per dot.
pub fn render_to_braille(
    frame: &FrameView,
    canvas_width: u16,
    canvas_height: u16,
    portrait: bool,
) -> Vec<BrailleCell> {
    let (src_width, src_height) = display_size(frame, portrait);

    // Braille effective resolution
    let braille_width = canvas_width as usize * 2;
    let braille_height = canvas_height as usize * 4;
    if braille_width == 0 || braille_height == 0 {
        return Vec::new();
    }

    // Source pixels per dot, never below one
    let step_x = src_width.div_ceil(braille_width).max(1);
    let step_y = src_height.div_ceil(braille_height).max(1);

    let used_width = src_width.div_ceil(step_x).div_ceil(2);
    let used_height = src_height.div_ceil(step_y).div_ceil(4);
    let offset_x = (canvas_width as usize).saturating_sub(used_width) / 2;
    let offset_y = (canvas_height as usize).saturating_sub(used_height) / 2;

    let mut cells = Vec::new();

    for cy in 0..used_height.min(canvas_height as usize) {
        for cx in 0..used_width.min(canvas_width as usize) {
            let mut pattern: u8 = 0;

            for dx in 0..2 {
                for dy in 0..4 {
                    let x0 = (cx * 2 + dx) * step_x;
                    let y0 = (cy * 4 + dy) * step_y;

                    let lit = (y0..(y0 + step_y).min(src_height)).any(|y| {
                        (x0..(x0 + step_x).min(src_width))
                            .any(|x| display_pixel(frame, x, y, portrait))
                    });
                    if lit {
                        pattern |= BRAILLE_DOTS[dx][dy];
                    }
                }
            }

            // Only emit cells that have at least one dot
            if pattern != 0 {
                let braille_char = char::from_u32(BRAILLE_BASE + pattern as u32).unwrap_or(' ');
                cells.push(BrailleCell {
                    x: (cx + offset_x) as u16,
                    y: (cy + offset_y) as u16,
                    char: braille_char,
                });
            }
        }
    }

    cells
}
