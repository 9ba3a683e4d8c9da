mod ball;
mod color;
mod missile;
mod palette;
mod player;
mod playfield;

use crate::memory::{TiaReadAddress, TiaWriteAddress};
use image::Rgba;
use log::debug;
use std::{cell::RefCell, rc::Rc};
use {
    ball::Ball, color::Colors, missile::Missile, palette::NTSC_PALETTE, player::Player,
    playfield::Playfield,
};

pub const FRAME_WIDTH: usize = 160;
pub const FRAME_HEIGHT: usize = 192;

/// Visible clocks per scanline; every movable object wraps at this width.
pub(crate) const LINE_LENGTH: usize = 160;

const TOTAL_WIDTH: usize = 228;
const TOTAL_HEIGHT: usize = 262;
const H_BLANK_CLOCKS: usize = 68;
// Vertical sync and blank bands above the picture
const V_BLANK_SCANLINES: usize = 40;

/// One finished frame, handed to the host by reference.
pub type FramePixels = [[Rgba<u8>; FRAME_WIDTH]; FRAME_HEIGHT];

pub type SharedColor = Rc<RefCell<Colors>>;

#[derive(Debug, Clone, Copy)]
pub enum PlayerType {
    Player0,
    Player1,
}

/// The HMxx registers keep a signed offset in the high nibble; positive
/// values move an object left, negative values right.
pub(crate) fn motion_offset(hm: u8) -> i16 {
    let nibble = (hm >> 4) as i16;
    if nibble < 8 {
        nibble
    } else {
        nibble - 16
    }
}

/// Copy placement (in visible clocks) selected by the low NUSIZ bits.
/// Patterns 0b101 and 0b111 trade copies for a stretched single sprite.
pub(crate) fn nusiz_copies(nusiz: u8) -> &'static [usize] {
    match nusiz & 0x07 {
        0b001 => &[0, 16],
        0b010 => &[0, 32],
        0b011 => &[0, 16, 32],
        0b100 => &[0, 64],
        0b110 => &[0, 32, 64],
        _ => &[0],
    }
}

pub struct Tia {
    // Beam position: column within the 228-clock scanline and scanline
    // within the 262-line raster
    h: usize,
    v: usize,

    // Frame timing
    vsync: bool,
    vblank: u8,

    // Horizontal sync
    wsync: bool,

    // Input
    // Only player 0's fire button is wired up, so one input port
    inpt4_port: bool,
    inpt4_latch: bool,

    // Collision registers
    cxm0p: u8,
    cxm1p: u8,
    cxp0fb: u8,
    cxp1fb: u8,
    cxm0fb: u8,
    cxm1fb: u8,
    cxblpf: u8,
    cxppmm: u8,

    colors: SharedColor,

    // Graphics
    pf: Playfield,
    p0: Player,
    p1: Player,
    m0: Missile,
    m1: Missile,
    bl: Ball,

    pixels: Box<FramePixels>,
    frame_done: bool,

    // Monotonic counters
    color_clocks: u64,
    frames: u64,
}

impl Default for Tia {
    fn default() -> Self {
        let colors = Rc::new(RefCell::new(Colors::new()));
        let pf = Playfield::new(colors.clone());
        let bl = Ball::new(colors.clone());
        let m0 = Missile::new(colors.clone(), PlayerType::Player0);
        let m1 = Missile::new(colors.clone(), PlayerType::Player1);
        let p0 = Player::new(colors.clone(), PlayerType::Player0);
        let p1 = Player::new(colors.clone(), PlayerType::Player1);

        Self {
            h: 0,
            v: 0,

            vsync: false,
            vblank: 0,

            wsync: false,

            // These two ports have latches that are both enabled by writing a "1" or disabled by
            // writing a "0" to D6 of VBLANK. When disabled, the microprocessor reads the logic
            // level of the port directly. When enabled, the latch is set for logic one and remains
            // that way until its port goes LOW.
            inpt4_port: false,
            inpt4_latch: true,

            cxm0p: 0,
            cxm1p: 0,
            cxp0fb: 0,
            cxp1fb: 0,
            cxm0fb: 0,
            cxm1fb: 0,
            cxblpf: 0,
            cxppmm: 0,

            colors,

            pf,
            bl,
            m0,
            m1,
            p0,
            p1,

            pixels: Box::new([[Rgba([0, 0, 0, 0xff]); FRAME_WIDTH]; FRAME_HEIGHT]),
            frame_done: false,

            color_clocks: 0,
            frames: 0,
        }
    }
}

impl Tia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn beam(&self) -> (usize, usize) {
        (self.h, self.v)
    }

    pub fn cpu_halt(&self) -> bool {
        self.wsync
    }

    pub fn color_clocks(&self) -> u64 {
        self.color_clocks
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// True once per completed frame; reading it re-arms the flag.
    pub fn frame_ready(&mut self) -> bool {
        std::mem::take(&mut self.frame_done)
    }

    pub fn frame_pixels(&self) -> &FramePixels {
        &self.pixels
    }

    pub fn in_vblank(&self) -> bool {
        (self.vblank & 0x02) != 0
    }

    pub fn in_vsync(&self) -> bool {
        self.vsync
    }

    pub fn joystick_fire(&mut self, pressed: bool) {
        self.inpt4_port = !pressed;

        if !self.inpt4_port {
            // When the port goes LOW the latch goes LOW and remains that way (until re-enabled by
            // VBLANK Bit 6) regardless of what the port does
            self.inpt4_latch = false;
        }
    }

    fn reset_latches(&mut self) {
        self.inpt4_latch = true
    }

    /// Runs the pixel clock for `clocks` ticks.
    pub fn advance(&mut self, clocks: u64) {
        for _ in 0..clocks {
            self.tick();
        }
    }

    fn tick(&mut self) {
        if self.visible() {
            let x = self.h - H_BLANK_CLOCKS;
            let y = self.v - V_BLANK_SCANLINES;
            let color = self.pixel_color(x);
            self.pixels[y][x] = NTSC_PALETTE[color as usize];
            self.update_collisions(x);
        }

        self.color_clocks += 1;
        self.h += 1;
        if self.h == TOTAL_WIDTH {
            // Leading edge of horizontal blank; a WSYNC stall ends here.
            self.h = 0;
            self.wsync = false;

            self.v += 1;
            if self.v == TOTAL_HEIGHT {
                self.v = 0;
                self.frames += 1;
                self.frame_done = true;
            }
        }
    }

    fn visible(&self) -> bool {
        self.h >= H_BLANK_CLOCKS
            && (V_BLANK_SCANLINES..V_BLANK_SCANLINES + FRAME_HEIGHT).contains(&self.v)
            && !self.in_vsync()
            && !self.in_vblank()
    }

    /// The visible column the beam is over, for the position-reset strobes.
    /// During horizontal blank an object parks at the left edge.
    fn beam_column(&self) -> usize {
        self.h.saturating_sub(H_BLANK_CLOCKS)
    }

    // Resolve playfield/player/missile/ball priorities and return the color
    // to be rendered.
    fn pixel_color(&self, x: usize) -> u8 {
        if !self.pf.priority() {
            // When pixels of two or more objects overlap each other, only the
            // pixel of the object with topmost priority is drawn to the screen.
            // The normal priority ordering is:
            //
            //  Priority     Color    Objects
            //  1 (highest)  COLUP0   P0, M0  (and left side of PF in SCORE-mode)
            //  2            COLUP1   P1, M1  (and right side of PF in SCORE-mode)
            //  3            COLUPF   BL, PF  (only BL in SCORE-mode)
            //  4 (lowest)   COLUBK   BK

            self.p0
                .get_color(x)
                .or(self.p1.get_color(x))
                .or(self.m0.get_color(x))
                .or(self.m1.get_color(x))
                .or(self.bl.get_color(x))
                .or(self.pf.color_at(x))
                .unwrap_or(self.colors.borrow().colubk())
        } else {
            // Optionally, the playfield and ball may be assigned to have higher
            // priority (by setting CTRLPF.2). The priority ordering is then:
            //
            //  Priority     Color    Objects
            //  1 (highest)  COLUPF   PF, BL  (always, the SCORE-bit is ignored)
            //  2            COLUP0   P0, M0
            //  3            COLUP1   P1, M1
            //  4 (lowest)   COLUBK   BK

            self.pf
                .color_at(x)
                .or(self.bl.get_color(x))
                .or(self.p0.get_color(x))
                .or(self.p1.get_color(x))
                .or(self.m0.get_color(x))
                .or(self.m1.get_color(x))
                .unwrap_or(self.colors.borrow().colubk())
        }
    }

    fn update_collisions(&mut self, x: usize) {
        const BIT_6: u8 = 0x40;
        const BIT_7: u8 = 0x80;

        let p0 = self.p0.pixel_bit(x);
        let p1 = self.p1.pixel_bit(x);
        let m0 = self.m0.pixel_bit(x);
        let m1 = self.m1.pixel_bit(x);
        let bl = self.bl.pixel_bit(x);
        let pf = self.pf.color_at(x).is_some();

        macro_rules! check_collision {
            ($register: ident, $a: expr, $b: expr, $c: expr) => {
                if $a && $b {
                    self.$register |= BIT_6;
                }
                if $a && $c {
                    self.$register |= BIT_7;
                }
            };
        }

        check_collision!(cxm0p, m0, p0, p1);
        check_collision!(cxm1p, m1, p1, p0);
        check_collision!(cxp0fb, p0, bl, pf);
        check_collision!(cxp1fb, p1, bl, pf);
        check_collision!(cxm0fb, m0, bl, pf);
        check_collision!(cxm1fb, m1, bl, pf);

        // bit 6 of CXBLPF is unused
        if bl && pf {
            self.cxblpf |= BIT_7
        }

        if m0 && m1 {
            self.cxppmm |= BIT_6
        }

        if p0 && p1 {
            self.cxppmm |= BIT_7
        }
    }

    fn apply_hmove_all(&mut self) {
        self.bl.apply_hmove();
        self.m0.apply_hmove();
        self.m1.apply_hmove();
        self.p0.apply_hmove();
        self.p1.apply_hmove();
    }
}

impl Tia {
    pub fn read(&mut self, address: TiaReadAddress) -> u8 {
        use TiaReadAddress::*;
        match address {
            CXM0P => self.cxm0p,
            CXM1P => self.cxm1p,
            CXP0FB => self.cxp0fb,
            CXP1FB => self.cxp1fb,
            CXM0FB => self.cxm0fb,
            CXM1FB => self.cxm1fb,
            CXBLPF => self.cxblpf,
            CXPPMM => self.cxppmm,
            INPT4 => {
                // Check the logic level of the port
                let mut level = self.inpt4_port;

                // When the latch is enabled in D6 of VBLANK, check the latch value aswell
                if (self.vblank & 0x40) != 0 {
                    level = level && self.inpt4_latch;
                }

                if level {
                    0x80
                } else {
                    0x00
                }
            }
            _ => 0,
        }
    }

    pub fn write(&mut self, address: TiaWriteAddress, val: u8) {
        use TiaWriteAddress::*;
        match address {
            //
            // Frame timing and synchronisation
            //
            VSYNC => self.vsync = (val & 0x02) != 0,
            VBLANK => {
                self.vblank = val;

                if (val & 0x80) != 0 {
                    // INPT4-5 latches are reset when D7 of VBLANK is 1
                    self.reset_latches();
                }
            }
            // Simply writing to WSYNC halts the microprocessor until the
            // beam reaches the right edge of the screen.
            WSYNC => self.wsync = true,
            RSYNC => self.h = 0,

            //
            // Colors
            //
            COLUP0 => self.colors.borrow_mut().set_colup0(val),
            COLUP1 => self.colors.borrow_mut().set_colup1(val),
            COLUPF => self.colors.borrow_mut().set_colupf(val),
            COLUBK => self.colors.borrow_mut().set_colubk(val),
            CTRLPF => {
                self.pf.set_control(val);
                self.bl.set_size(1 << ((val & 0b0011_0000) >> 4));
            }

            //
            // Playfield
            //
            PF0 => self.pf.set_pf0(val),
            PF1 => self.pf.set_pf1(val),
            PF2 => self.pf.set_pf2(val),

            //
            // Sprites
            //
            NUSIZ0 => {
                self.m0.set_nusiz(val);
                self.p0.set_nusiz(val);
            }
            NUSIZ1 => {
                self.m1.set_nusiz(val);
                self.p1.set_nusiz(val);
            }
            REFP0 => self.p0.set_horizontal_mirror((val & 0b0000_1000) != 0),
            REFP1 => self.p1.set_horizontal_mirror((val & 0b0000_1000) != 0),
            RESP0 => {
                let column = self.beam_column();
                self.p0.reset_to(column);
            }
            RESP1 => {
                let column = self.beam_column();
                self.p1.reset_to(column);
            }
            RESM0 => {
                let column = self.beam_column();
                self.m0.reset_to(column);
            }
            RESM1 => {
                let column = self.beam_column();
                self.m1.reset_to(column);
            }
            RESBL => {
                let column = self.beam_column();
                self.bl.reset_to(column);
            }
            AUDC0 => {
                debug!("AUDC0: {}", val)
            }
            AUDC1 => {
                debug!("AUDC1: {}", val)
            }
            AUDF0 => {
                debug!("AUDF0: {}", val)
            }
            AUDF1 => {
                debug!("AUDF1: {}", val)
            }
            AUDV0 => {
                debug!("AUDV0: {}", val)
            }
            AUDV1 => {
                debug!("AUDV1: {}", val)
            }
            GRP0 => {
                self.p0.set_graphic(val);
                self.p1.set_vdel_value();
            }
            GRP1 => {
                self.p1.set_graphic(val);
                self.p0.set_vdel_value();
                self.bl.set_vdel_value();
            }
            ENAM0 => self.m0.set_enabled((val & 0x02) != 0),
            ENAM1 => self.m1.set_enabled((val & 0x02) != 0),
            ENABL => self.bl.set_enabled((val & 0x02) != 0),

            //
            // Horizontal motion
            //
            HMP0 => self.p0.set_hmove_value(val),
            HMP1 => self.p1.set_hmove_value(val),
            HMM0 => self.m0.set_hmove_value(val),
            HMM1 => self.m1.set_hmove_value(val),
            HMBL => self.bl.set_hmove_value(val),
            VDELP0 => self.p0.set_vdel((val & 0x01) != 0),
            VDELP1 => self.p1.set_vdel((val & 0x01) != 0),
            VDELBL => self.bl.set_vdel((val & 0x01) != 0),
            RESMP0 => {
                if (val & 0x02) != 0 {
                    self.m0.reset_to_player(&self.p0);
                }
            }
            RESMP1 => {
                if (val & 0x02) != 0 {
                    self.m1.reset_to_player(&self.p1);
                }
            }
            HMOVE => self.apply_hmove_all(),
            HMCLR => {
                self.bl.hmclr();
                self.m0.hmclr();
                self.m1.hmclr();
                self.p0.hmclr();
                self.p1.hmclr();
            }
            CXCLR => {
                self.cxm0p = 0;
                self.cxm1p = 0;
                self.cxp0fb = 0;
                self.cxp1fb = 0;
                self.cxm0fb = 0;
                self.cxm1fb = 0;
                self.cxblpf = 0;
                self.cxppmm = 0;
            }
        }
    }
}
