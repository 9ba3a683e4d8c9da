use crate::memory::PiaAddress;
use log::debug;

// The RIOT (RAM/IO/Timer) chip. Also known as the PIA. It's a MOS 6532 chip.
pub(crate) struct Riot {
    ram: [u8; 128],

    // Registers
    swcha: u8,
    swacnt: u8,
    swchb: u8,
    swbcnt: u8,
    intim: u8,
    instat: u8,

    // Port levels behind the registers (active low)
    port_a: u8,
    port_b: u8,

    // Interval timer: INTIM decrements once every `interval` clocks
    interval: u64,
    sub_counter: u64,

    // Monotonic count of PIA clocks
    clocks: u64,
}

impl Default for Riot {
    fn default() -> Self {
        // Port B powers up with the difficulty bits set and the color switch
        // on color; reset and select read released. Port A reads all
        // directions released.
        let port_b = 0b1100_1011;
        let port_a = 0xff;

        Self {
            ram: [0; 128],

            swcha: 0,
            swacnt: 0,
            swchb: 0,
            swbcnt: 0,
            intim: 0,
            instat: 0,

            port_a,
            port_b,

            interval: 1024,
            sub_counter: 1023,

            clocks: 0,
        }
    }
}

impl Riot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clocks(&self) -> u64 {
        self.clocks
    }

    //
    // Console switches
    //
    pub fn color(&mut self) {
        if (self.port_b & 0b0000_1000) != 0 {
            self.port_b &= 0b1111_0111;
        } else {
            self.port_b |= 0b0000_1000
        }
    }

    pub fn reset(&mut self, pressed: bool) {
        if pressed {
            self.port_b &= 0b1111_1110;
        } else {
            self.port_b |= 0b0000_0001;
        }
    }

    pub fn select(&mut self, pressed: bool) {
        if pressed {
            self.port_b &= 0b1111_1101;
        } else {
            self.port_b |= 0b0000_0010;
        }
    }

    //
    // Player 0 joystick, on the high nibble of port A. The low nibble
    // belongs to the second joystick and stays released.
    //
    pub fn up(&mut self, pressed: bool) {
        if pressed {
            self.port_a &= 0b1110_1111
        } else {
            self.port_a |= 0b0001_0000
        }
    }

    pub fn down(&mut self, pressed: bool) {
        if pressed {
            self.port_a &= 0b1101_1111
        } else {
            self.port_a |= 0b0010_0000
        }
    }

    pub fn left(&mut self, pressed: bool) {
        if pressed {
            self.port_a &= 0b1011_1111
        } else {
            self.port_a |= 0b0100_0000
        }
    }

    pub fn right(&mut self, pressed: bool) {
        if pressed {
            self.port_a &= 0b0111_1111
        } else {
            self.port_a |= 0b1000_0000
        }
    }

    /// Runs the timer for `cycles` PIA clocks.
    pub fn advance(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.tick();
        }
    }

    fn tick(&mut self) {
        self.clocks += 1;

        if self.sub_counter == 0 {
            self.sub_counter = self.interval - 1;
            self.decrement();
        } else {
            self.sub_counter -= 1;
        }
    }

    // Initialises the timer at a certain interval. The interval determines
    // how many clocks of the RIOT are required to decrement the timer value
    // denoted by the INTIM register; the first decrement lands a full
    // interval after the write.
    fn init_timer(&mut self, val: u8, interval: u64) {
        self.intim = val;
        self.instat = 0;
        self.interval = interval;
        self.sub_counter = interval - 1;
    }

    fn decrement(&mut self) {
        if self.intim == 0 {
            // The count pins at zero; INSTAT records that the timer has
            // passed it.
            self.instat = 0b1100_0000;
        } else {
            self.intim -= 1;
        }
    }

    pub fn ram_read(&self, offset: usize) -> u8 {
        self.ram[offset]
    }

    pub fn ram_write(&mut self, offset: usize, val: u8) {
        self.ram[offset] = val;
    }

    pub fn read(&mut self, reg: PiaAddress) -> u8 {
        use PiaAddress::*;
        match reg {
            SWCHA => {
                // The bits of SWACNT set the data direction for the corresponding bits of SWCHA, 0
                // being for input, and 1 for output.
                // So all this faffing about is to enforce this.
                // This is also the case for SWCHB/SWBCNT.
                (self.swcha & self.swacnt) | (self.port_a & (self.swacnt ^ 0xff))
            }
            SWACNT => self.swacnt,
            SWCHB => (self.swchb & self.swbcnt) | (self.port_b & (self.swbcnt ^ 0xff)),
            SWBCNT => self.swbcnt,
            INTIM => self.intim,
            INSTAT => {
                let rv = self.instat;
                self.instat &= 0b1011_1111;
                rv
            }
            _ => 0,
        }
    }

    pub fn write(&mut self, reg: PiaAddress, val: u8) {
        use PiaAddress::*;
        match reg {
            SWCHA => self.swcha = val,
            SWACNT => self.swacnt = val,
            SWBCNT => self.swbcnt = val,
            TIM1T => self.init_timer(val, 1),
            TIM8T => self.init_timer(val, 8),
            TIM64T => self.init_timer(val, 64),
            T1024T => self.init_timer(val, 1024),
            _ => debug!("write to read-only PIA register {:?}", reg),
        }
    }
}
