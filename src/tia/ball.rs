use super::{motion_offset, SharedColor, LINE_LENGTH};

pub struct Ball {
    colors: SharedColor,

    pos: usize,
    hmove: u8,
    // Width in clocks, set from CTRLPF bits 4-5
    size: usize,

    // Flag indicating whether the ball is enabled for rendering
    enabled: bool,
    // The VDELBL register
    vdel: bool,
    old_value: bool,
}

impl Ball {
    pub fn new(colors: SharedColor) -> Self {
        Self {
            colors,

            pos: 0,
            hmove: 0,
            size: 1,

            enabled: false,

            vdel: false,
            old_value: false,
        }
    }

    pub fn set_enabled(&mut self, v: bool) {
        self.enabled = v
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size
    }

    pub fn set_vdel(&mut self, v: bool) {
        self.vdel = v
    }

    pub fn set_vdel_value(&mut self) {
        self.old_value = self.enabled
    }

    pub fn set_hmove_value(&mut self, v: u8) {
        self.hmove = v
    }

    pub fn hmclr(&mut self) {
        self.hmove = 0
    }

    pub fn reset_to(&mut self, column: usize) {
        self.pos = column % LINE_LENGTH;
    }

    pub fn apply_hmove(&mut self) {
        let offset = motion_offset(self.hmove);
        self.pos = (self.pos as i16 - offset).rem_euclid(LINE_LENGTH as i16) as usize;
    }

    pub fn pixel_bit(&self, x: usize) -> bool {
        let enabled = if self.vdel { self.old_value } else { self.enabled };
        if !enabled {
            return false;
        }

        let rel = (x + LINE_LENGTH - self.pos) % LINE_LENGTH;
        rel < self.size
    }

    pub fn get_color(&self, x: usize) -> Option<u8> {
        if self.pixel_bit(x) {
            Some(self.colors.borrow().colupf())
        } else {
            None
        }
    }
}
