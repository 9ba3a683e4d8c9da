use super::{motion_offset, nusiz_copies, PlayerType, SharedColor, LINE_LENGTH};
use crate::tia::player::Player;

pub struct Missile {
    colors: SharedColor,
    sibling_player: PlayerType,

    pos: usize,
    hmove: u8,
    // The whole NUSIZx byte: size in bits 4-5, copy pattern in bits 0-2
    nusiz: u8,

    enabled: bool,
}

impl Missile {
    pub fn new(colors: SharedColor, sibling_player: PlayerType) -> Self {
        Self {
            colors,
            sibling_player,

            pos: 0,
            hmove: 0,
            nusiz: 0,

            enabled: false,
        }
    }

    pub fn set_enabled(&mut self, v: bool) {
        self.enabled = v
    }

    pub fn set_nusiz(&mut self, v: u8) {
        self.nusiz = v
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

    /// RESMPx parks the missile on its player.
    pub fn reset_to_player(&mut self, player: &Player) {
        self.pos = player.position();
    }

    pub fn apply_hmove(&mut self) {
        let offset = motion_offset(self.hmove);
        self.pos = (self.pos as i16 - offset).rem_euclid(LINE_LENGTH as i16) as usize;
    }

    fn size(&self) -> usize {
        1 << ((self.nusiz >> 4) & 0x03)
    }

    pub fn pixel_bit(&self, x: usize) -> bool {
        if !self.enabled {
            return false;
        }

        // Missiles replicate with their player's copy pattern.
        let size = self.size();
        for &offset in nusiz_copies(self.nusiz & 0x07) {
            let start = (self.pos + offset) % LINE_LENGTH;
            let rel = (x + LINE_LENGTH - start) % LINE_LENGTH;
            if rel < size {
                return true;
            }
        }
        false
    }

    pub fn get_color(&self, x: usize) -> Option<u8> {
        if self.pixel_bit(x) {
            let colors = self.colors.borrow();
            Some(match self.sibling_player {
                PlayerType::Player0 => colors.colup0(),
                PlayerType::Player1 => colors.colup1(),
            })
        } else {
            None
        }
    }
}
