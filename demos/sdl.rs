use atari2600_core::{FramePixels, Host, InputEvent, FRAME_HEIGHT, FRAME_WIDTH};
use log::{error, info};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{TextureCreator, WindowCanvas};
use sdl2::video::WindowContext;
use sdl2::EventPump;
use std::env;
use std::error::Error;
use std::process;
use std::thread;
use std::time::{Duration, Instant};

const ATARI_FPS: f64 = 60.0;
const FRAME_DURATION: Duration = Duration::from_millis(((1.0 / ATARI_FPS) * 1000.0) as u64);
const HORIZONTAL_SCALING_FACTOR: u32 = 4;
const VERTICAL_SCALING_FACTOR: u32 = 2;

fn main() {
    env_logger::init();

    let rom_path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: atari2600 <rom-file>");
            process::exit(1);
        }
    };

    if let Err(e) = run(&rom_path) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(rom_path: &str) -> Result<(), Box<dyn Error>> {
    let host = SdlHost::new()?;
    let mut core = atari2600_core::init_emulator(rom_path, Box::new(host))?;
    core.run();
    Ok(())
}

struct SdlHost {
    canvas: WindowCanvas,
    texture_creator: TextureCreator<WindowContext>,
    event_pump: EventPump,
    frame_started: Instant,
}

impl SdlHost {
    fn new() -> Result<Self, Box<dyn Error>> {
        info!("Graphics: init");
        let width = FRAME_WIDTH as u32 * HORIZONTAL_SCALING_FACTOR;
        let height = FRAME_HEIGHT as u32 * VERTICAL_SCALING_FACTOR;

        let sdl_context = sdl2::init()?;
        let video_subsystem = sdl_context.video()?;
        info!("  video driver: {}", video_subsystem.current_video_driver());

        let window = video_subsystem
            .window("atari2600", width, height)
            .position_centered()
            .build()?;

        let canvas = window.into_canvas().target_texture().build()?;
        info!("  canvas driver: {}", canvas.info().name);

        let texture_creator = canvas.texture_creator();
        let event_pump = sdl_context.event_pump()?;

        Ok(Self {
            canvas,
            texture_creator,
            event_pump,
            frame_started: Instant::now(),
        })
    }

    fn render(&mut self, frame_pixels: &FramePixels) -> Result<(), Box<dyn Error>> {
        let mut texture = self.texture_creator.create_texture_streaming(
            PixelFormatEnum::RGB24,
            FRAME_WIDTH as u32,
            FRAME_HEIGHT as u32,
        )?;

        texture.with_lock(None, |buffer: &mut [u8], pitch: usize| {
            for (y, row) in frame_pixels.iter().enumerate() {
                for (x, color) in row.iter().enumerate() {
                    let offset = y * pitch + x * 3;
                    buffer[offset..offset + 3].copy_from_slice(&color.0[0..3]);
                }
            }
        })?;

        self.canvas.clear();
        self.canvas.copy(&texture, None, None)?;
        self.canvas.present();

        Ok(())
    }
}

impl Host for SdlHost {
    fn present_frame(&mut self, pixels: &FramePixels) {
        if let Err(e) = self.render(pixels) {
            error!("render: {}", e);
        }

        // Keep the emulation near real time; purely a presentation concern.
        if let Some(delay) = FRAME_DURATION.checked_sub(self.frame_started.elapsed()) {
            thread::sleep(delay);
        }
        self.frame_started = Instant::now();
    }

    fn poll_input(&mut self) -> Option<InputEvent> {
        while let Some(event) = self.event_pump.poll_event() {
            match event {
                Event::Quit { .. } => return Some(InputEvent::Quit),
                Event::KeyDown {
                    keycode: Some(key), ..
                } => {
                    if let Some(input) = translate_key(key, true) {
                        return Some(input);
                    }
                }
                Event::KeyUp {
                    keycode: Some(key), ..
                } => {
                    if let Some(input) = translate_key(key, false) {
                        return Some(input);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

fn translate_key(key: Keycode, pressed: bool) -> Option<InputEvent> {
    match key {
        // Joystick controls
        Keycode::W | Keycode::Up => Some(InputEvent::Up(pressed)),
        Keycode::A | Keycode::Left => Some(InputEvent::Left(pressed)),
        Keycode::S | Keycode::Down => Some(InputEvent::Down(pressed)),
        Keycode::D | Keycode::Right => Some(InputEvent::Right(pressed)),
        Keycode::N => Some(InputEvent::Fire(pressed)),

        // Console switches
        Keycode::F1 => Some(InputEvent::Select(pressed)),
        Keycode::F2 => Some(InputEvent::Reset(pressed)),
        Keycode::F3 if pressed => Some(InputEvent::ColorToggle),

        Keycode::Escape | Keycode::Q if pressed => Some(InputEvent::Quit),

        _ => None,
    }
}
