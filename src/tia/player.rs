use super::{motion_offset, nusiz_copies, PlayerType, SharedColor, LINE_LENGTH};

pub struct Player {
    colors: SharedColor,
    player: PlayerType,

    // Leftmost visible column of the first copy
    pos: usize,
    // Horizontal motion register (HMPx); the offset lives in the high nibble
    hmove: u8,
    // Player copies/stretch bits of NUSIZx
    nusiz: u8,

    // The REFPx register, for rendering backwards
    horizontal_mirror: bool,
    // The 8-bit graphic to draw
    graphic: u8,
    // The VDELPx register
    vdel: bool,
    old_value: u8,
}

impl Player {
    pub fn new(colors: SharedColor, player: PlayerType) -> Self {
        Self {
            colors,
            player,

            pos: 0,
            hmove: 0,
            nusiz: 0,

            horizontal_mirror: false,
            graphic: 0,

            vdel: false,
            old_value: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn set_graphic(&mut self, graphic: u8) {
        self.graphic = graphic
    }

    pub fn set_horizontal_mirror(&mut self, reflect: bool) {
        self.horizontal_mirror = reflect
    }

    pub fn set_nusiz(&mut self, v: u8) {
        self.nusiz = v & 0x07
    }

    pub fn set_vdel(&mut self, v: bool) {
        self.vdel = v
    }

    pub fn set_vdel_value(&mut self) {
        self.old_value = self.graphic
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

    /// Stretch factor of each graphic bit; NUSIZ trades copies for width.
    fn scale(&self) -> usize {
        match self.nusiz {
            0b101 => 2,
            0b111 => 4,
            _ => 1,
        }
    }

    pub fn pixel_bit(&self, x: usize) -> bool {
        let graphic = if self.vdel {
            self.old_value
        } else {
            self.graphic
        };
        if graphic == 0 {
            return false;
        }

        let scale = self.scale();
        for &offset in nusiz_copies(self.nusiz) {
            let start = (self.pos + offset) % LINE_LENGTH;
            let rel = (x + LINE_LENGTH - start) % LINE_LENGTH;
            if rel < 8 * scale {
                let bit = rel / scale;
                let idx = if self.horizontal_mirror { bit } else { 7 - bit };
                if (graphic >> idx) & 1 != 0 {
                    return true;
                }
            }
        }
        false
    }

    pub fn get_color(&self, x: usize) -> Option<u8> {
        if self.pixel_bit(x) {
            let colors = self.colors.borrow();
            Some(match self.player {
                PlayerType::Player0 => colors.colup0(),
                PlayerType::Player1 => colors.colup1(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tia::color::Colors;
    use std::{cell::RefCell, rc::Rc};

    fn player() -> Player {
        let colors = Rc::new(RefCell::new(Colors::new()));
        colors.borrow_mut().set_colup0(0x2e);
        Player::new(colors, PlayerType::Player0)
    }

    #[test]
    fn renders_graphic_msb_first() {
        let mut p = player();
        p.set_graphic(0b1000_0001);
        p.reset_to(40);
        assert!(p.pixel_bit(40));
        assert!(!p.pixel_bit(41));
        assert!(p.pixel_bit(47));
        assert!(!p.pixel_bit(48));
        assert_eq!(p.get_color(40), Some(0x2e));
        assert_eq!(p.get_color(41), None);
    }

    #[test]
    fn reflection_reverses_the_graphic() {
        let mut p = player();
        p.set_graphic(0b1000_0000);
        p.reset_to(40);
        p.set_horizontal_mirror(true);
        assert!(!p.pixel_bit(40));
        assert!(p.pixel_bit(47));
    }

    #[test]
    fn nusiz_draws_copies() {
        let mut p = player();
        p.set_graphic(0b1000_0000);
        p.reset_to(0);
        p.set_nusiz(0b011); // three copies close
        assert!(p.pixel_bit(0));
        assert!(p.pixel_bit(16));
        assert!(p.pixel_bit(32));
        assert!(!p.pixel_bit(48));
    }

    #[test]
    fn nusiz_quad_width_stretches() {
        let mut p = player();
        p.set_graphic(0b1000_0000);
        p.reset_to(0);
        p.set_nusiz(0b111);
        for x in 0..4 {
            assert!(p.pixel_bit(x), "x={}", x);
        }
        assert!(!p.pixel_bit(4));
    }

    #[test]
    fn hmove_moves_left_for_positive_nibbles() {
        let mut p = player();
        p.set_graphic(0xFF);
        p.reset_to(40);
        p.set_hmove_value(0x30); // +3
        p.apply_hmove();
        assert_eq!(p.position(), 37);

        p.set_hmove_value(0x80); // -8
        p.apply_hmove();
        assert_eq!(p.position(), 45);

        p.hmclr();
        p.apply_hmove();
        assert_eq!(p.position(), 45);
    }

    #[test]
    fn vdel_renders_the_buffered_graphic() {
        let mut p = player();
        p.reset_to(0);
        p.set_graphic(0b1000_0000);
        p.set_vdel_value();
        p.set_graphic(0b0100_0000);
        p.set_vdel(true);
        assert!(p.pixel_bit(0), "old value drawn while delayed");
        assert!(!p.pixel_bit(1));
        p.set_vdel(false);
        assert!(p.pixel_bit(1), "new value drawn once undelayed");
    }

    #[test]
    fn position_wraps_at_the_line_edge() {
        let mut p = player();
        p.set_graphic(0xFF);
        p.reset_to(156);
        assert!(p.pixel_bit(156));
        assert!(p.pixel_bit(3), "the sprite wraps to the left edge");
        assert!(!p.pixel_bit(4));
    }
}
