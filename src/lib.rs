mod bus;
mod cartridge;
mod cpu6507;
#[cfg(feature = "disassembler")]
mod disassembler;
mod host;
#[allow(clippy::upper_case_acronyms)]
pub(crate) mod memory;
mod opcode;
mod riot;
mod tia;

pub use crate::cartridge::{Cartridge, CartridgeError};
pub use crate::host::{Host, InputEvent, NullHost};
pub use crate::tia::{FramePixels, FRAME_HEIGHT, FRAME_WIDTH};

use crate::{bus::AtariBus, cpu6507::Cpu6507, riot::Riot, tia::Tia};
use log::info;
use std::path::Path;
use std::{cell::RefCell, rc::Rc};
use thiserror::Error;

type SharedRiot = Rc<RefCell<Riot>>;
type SharedTia = Rc<RefCell<Tia>>;

/// The TIA runs three color clocks for every CPU machine cycle.
const COLOR_CLOCKS_PER_CPU_CYCLE: u64 = 3;

#[derive(Debug, Error)]
pub enum EmuError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[cfg(feature = "disassembler")]
    #[error("unable to create the disassembly file: {0}")]
    Disassembler(#[source] std::io::Error),
}

/// The console: CPU, TIA and RIOT in lockstep around one shared address
/// space, plus the host everything is presented to. Each instance is
/// self-contained, so several machines can coexist.
pub struct EmulatorCore {
    cpu: Cpu6507,
    tia: SharedTia,
    riot: SharedRiot,
    host: Box<dyn Host>,
    #[cfg(feature = "disassembler")]
    disassembler: disassembler::Disassembler,
}

pub fn init_emulator<P: AsRef<Path>>(
    rom_path: P,
    host: Box<dyn Host>,
) -> Result<EmulatorCore, EmuError> {
    let cartridge = Cartridge::load(rom_path)?;
    EmulatorCore::with_cartridge(cartridge, host)
}

impl EmulatorCore {
    pub fn with_cartridge(cartridge: Cartridge, host: Box<dyn Host>) -> Result<Self, EmuError> {
        info!("RIOT: init");
        let riot = Rc::new(RefCell::new(Riot::new()));
        riot.borrow_mut().up(false);
        riot.borrow_mut().down(false);
        riot.borrow_mut().left(false);
        riot.borrow_mut().right(false);
        riot.borrow_mut().select(false);
        riot.borrow_mut().reset(false);

        info!("TIA: init");
        let tia = Rc::new(RefCell::new(Tia::new()));
        tia.borrow_mut().joystick_fire(false);

        let bus = AtariBus::new(tia.clone(), riot.clone(), cartridge);

        info!("CPU: init");
        let mut cpu = Cpu6507::new(Box::new(bus));
        cpu.reset();

        Ok(Self {
            cpu,
            tia,
            riot,
            host,
            #[cfg(feature = "disassembler")]
            disassembler: disassembler::Disassembler::new().map_err(EmuError::Disassembler)?,
        })
    }

    /// Runs until the CPU stops, which happens when the host reports a quit.
    pub fn run(&mut self) {
        while self.cpu.running() {
            self.step();
        }
    }

    /// One iteration of the co-execution loop: the CPU executes an
    /// instruction (or stalls on WSYNC for a single cycle), then the TIA and
    /// the RIOT catch up at their clock ratios, then input is polled.
    pub fn step(&mut self) {
        let cycles = if self.tia.borrow().cpu_halt() {
            1
        } else {
            self.cpu_step()
        };

        self.tia
            .borrow_mut()
            .advance(COLOR_CLOCKS_PER_CPU_CYCLE * cycles);
        self.riot.borrow_mut().advance(cycles);

        if self.tia.borrow_mut().frame_ready() {
            let tia = self.tia.borrow();
            self.host.present_frame(tia.frame_pixels());
        }

        if let Some(event) = self.host.poll_input() {
            self.dispatch(event);
        }
    }

    #[cfg(not(feature = "disassembler"))]
    fn cpu_step(&mut self) -> u64 {
        self.cpu.step()
    }

    #[cfg(feature = "disassembler")]
    fn cpu_step(&mut self) -> u64 {
        let old = disassembler::CpuState::record(&self.cpu);
        let cycles = self.cpu.step();
        self.disassembler.record(&mut self.cpu, &old);
        cycles
    }

    fn dispatch(&mut self, event: InputEvent) {
        match event {
            InputEvent::Up(pressed) => self.up(pressed),
            InputEvent::Down(pressed) => self.down(pressed),
            InputEvent::Left(pressed) => self.left(pressed),
            InputEvent::Right(pressed) => self.right(pressed),
            InputEvent::Fire(pressed) => self.joystick_fire(pressed),
            InputEvent::Select(pressed) => self.select(pressed),
            InputEvent::Reset(pressed) => self.reset(pressed),
            InputEvent::ColorToggle => self.color(),
            InputEvent::Quit => self.cpu.halt(),
        }
    }

    pub fn machine_cycles(&self) -> u64 {
        self.cpu.total_cycles()
    }

    pub fn color_clocks(&self) -> u64 {
        self.tia.borrow().color_clocks()
    }

    pub fn pia_clocks(&self) -> u64 {
        self.riot.borrow().clocks()
    }

    pub fn frames(&self) -> u64 {
        self.tia.borrow().frames()
    }

    /// Current beam position, mostly of interest to debugging hosts.
    pub fn beam(&self) -> (usize, usize) {
        self.tia.borrow().beam()
    }
}

/// Input fan-out: directions and console switches go to the RIOT's ports,
/// the fire button to the TIA's input latch.
pub trait KeyEvent {
    fn up(&mut self, pressed: bool);
    fn down(&mut self, pressed: bool);
    fn left(&mut self, pressed: bool);
    fn right(&mut self, pressed: bool);
    fn select(&mut self, pressed: bool);
    fn reset(&mut self, pressed: bool);
    fn joystick_fire(&mut self, pressed: bool);
    fn color(&mut self);
}

impl KeyEvent for EmulatorCore {
    fn up(&mut self, pressed: bool) {
        self.riot.borrow_mut().up(pressed);
    }

    fn down(&mut self, pressed: bool) {
        self.riot.borrow_mut().down(pressed);
    }

    fn left(&mut self, pressed: bool) {
        self.riot.borrow_mut().left(pressed);
    }

    fn right(&mut self, pressed: bool) {
        self.riot.borrow_mut().right(pressed);
    }

    fn reset(&mut self, pressed: bool) {
        self.riot.borrow_mut().reset(pressed);
    }

    fn select(&mut self, pressed: bool) {
        self.riot.borrow_mut().select(pressed);
    }

    fn joystick_fire(&mut self, pressed: bool) {
        self.tia.borrow_mut().joystick_fire(pressed);
    }

    fn color(&mut self) {
        self.riot.borrow_mut().color();
    }
}
