//! Fixed color palettes of the three segmentation domains.
//!
//! The position of a color is its label id. Models trained on these labels
//! depend on the ordering, so entries must never be reordered or removed.

use std::collections::HashMap;
use std::sync::OnceLock;

pub type Rgb = [u8; 3];

pub const BODY_COLORS: [Rgb; 15] = [
    [127, 127, 127],
    [0, 255, 255],
    [255, 255, 0], // hand
    [127, 127, 0],
    [255, 127, 127],
    [0, 255, 0],
    [0, 0, 0],
    [255, 127, 0], // hand
    [0, 0, 255],
    [127, 255, 127],
    [0, 127, 255],
    [127, 0, 255], // foot
    [255, 255, 127],
    [255, 0, 0],
    [255, 0, 255], // foot
];

/// Everything below `CLOTH_MASK_THRESHOLD` is garment or skin that the
/// agnostic person image must not show; background sits right at the
/// threshold so `no_bg` can pull it into the mask.
pub const CLOTH_COLORS: [Rgb; 20] = [
    [128, 0, 128],   // upper
    [128, 128, 64],  // left arm
    [128, 128, 192], // right arm
    [0, 255, 0],     // neck
    [0, 128, 128],   // dress
    [128, 128, 128],
    [0, 0, 0], // background
    [0, 128, 0], // hair
    [0, 64, 0],
    [128, 128, 0], // right hand
    [0, 192, 0],   // left foot
    [128, 0, 192], // head
    [0, 0, 192],
    [0, 64, 128],
    [128, 0, 64],  // left hand
    [0, 192, 128], // right foot
    [0, 0, 128],
    [0, 128, 64],
    [0, 0, 64],
    [0, 128, 192],
];

pub const CLOTH_MASK_THRESHOLD: usize = 6;
pub const CLOTH_BACKGROUND: Rgb = [0, 0, 0];
pub const HEAD_COLORS: [Rgb; 2] = [[0, 128, 0], [128, 0, 192]];

pub const DENSEPOSE_COLORS: [Rgb; 25] = [
    [0, 0, 0], // background
    [37, 60, 163],
    [20, 80, 194],
    [4, 97, 223],
    [8, 110, 221],
    [14, 122, 216],
    [20, 132, 212],
    [15, 144, 208],
    [11, 156, 203],
    [6, 166, 198],
    [22, 173, 185],
    [38, 179, 172],
    [55, 185, 159],
    [86, 187, 144],
    [114, 189, 130],
    [145, 191, 116],
    [170, 189, 105],
    [192, 188, 96],
    [216, 186, 86],
    [228, 192, 74],
    [240, 199, 60],
    [252, 206, 46],
    [251, 220, 36],
    [250, 235, 25],
    [249, 251, 14],
];

#[inline]
pub fn pack_rgb(rgb: Rgb) -> u32 {
    (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32
}

#[derive(Debug)]
pub struct Palette {
    name: &'static str,
    colors: &'static [Rgb],
    lookup: HashMap<u32, u8>,
}

impl Palette {
    fn new(name: &'static str, colors: &'static [Rgb]) -> Self {
        let mut lookup = HashMap::with_capacity(colors.len());
        for (label, &color) in (0..=u8::MAX).zip(colors) {
            lookup.insert(pack_rgb(color), label);
        }

        Palette {
            name,
            colors,
            lookup,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn colors(&self) -> &'static [Rgb] {
        self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn label_of(&self, rgb: Rgb) -> Option<u8> {
        self.lookup.get(&pack_rgb(rgb)).copied()
    }
}

// Labels are stored as u8.
const _: () = assert!(BODY_COLORS.len() <= 256);
const _: () = assert!(CLOTH_COLORS.len() <= 256);
const _: () = assert!(DENSEPOSE_COLORS.len() <= 256);

pub fn body() -> &'static Palette {
    static PALETTE: OnceLock<Palette> = OnceLock::new();
    PALETTE.get_or_init(|| Palette::new("body", &BODY_COLORS))
}

pub fn cloth() -> &'static Palette {
    static PALETTE: OnceLock<Palette> = OnceLock::new();
    PALETTE.get_or_init(|| Palette::new("cloth", &CLOTH_COLORS))
}

pub fn densepose() -> &'static Palette {
    static PALETTE: OnceLock<Palette> = OnceLock::new();
    PALETTE.get_or_init(|| Palette::new("densepose", &DENSEPOSE_COLORS))
}
