//! CHIP-8 virtual machine.
//!
//! Façade over the CPU and its peripherals. The host drives a 60 Hz
//! loop: update the keypad, run `instructions_per_frame` steps (or one
//! `frame` call), tick the timers once, then read the framebuffer and
//! the sound predicate. The machine never blocks and never sleeps.

use tracing::debug;

use crate::{
    core::{
        cpu::Cpu,
        quirks::Quirks,
        rng::RandomSource,
        types::{C8Byte, C8RegIdx},
    },
    errors::{RomError, StepError},
    peripherals::{memory::ROM_START_ADDR, screen::VIDEO_MEMORY_SIZE},
};

/// Default instruction count per 60 Hz frame (~500 Hz clock).
pub const DEFAULT_INSTRUCTIONS_PER_FRAME: usize = 8;

/// Execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Executing normally.
    Running,
    /// Stopped on a fatal fault; reset required.
    Halted,
}

/// CHIP-8 virtual machine.
pub struct Vm {
    /// CPU handle.
    pub cpu: Cpu,

    state: ExecutionState,
    rom: Vec<C8Byte>,
    instructions_per_frame: usize,
}

impl Vm {
    /// Create new CHIP-8 virtual machine.
    ///
    /// Zero-initialized, font pre-loaded, PC at 0x200.
    pub fn new() -> Self {
        let mut cpu = Cpu::new();
        cpu.load_font_in_memory();

        Vm {
            cpu,
            state: ExecutionState::Running,
            rom: Vec::new(),
            instructions_per_frame: DEFAULT_INSTRUCTIONS_PER_FRAME,
        }
    }

    /// Set quirk configuration.
    ///
    /// # Arguments
    ///
    /// * `quirks` - Quirk flags.
    ///
    pub fn set_quirks(&mut self, quirks: Quirks) {
        self.cpu.quirks = quirks;
    }

    /// Replace the random byte source.
    ///
    /// # Arguments
    ///
    /// * `rng` - Random source.
    ///
    pub fn set_random_source(&mut self, rng: Box<dyn RandomSource>) {
        self.cpu.set_random_source(rng);
    }

    /// Set instruction count per frame.
    ///
    /// # Arguments
    ///
    /// * `count` - Instructions per 60 Hz frame.
    ///
    pub fn set_instructions_per_frame(&mut self, count: usize) {
        self.instructions_per_frame = count;
    }

    /// Load ROM data.
    ///
    /// The bytes are copied at 0x200 and retained for `reset`.
    ///
    /// # Arguments
    ///
    /// * `bytes` - ROM bytes.
    ///
    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<(), RomError> {
        self.cpu.peripherals.memory.load_rom(bytes)?;
        self.rom = bytes.to_vec();

        Ok(())
    }

    /// Execute one instruction.
    ///
    /// A stack fault halts the machine; further steps return
    /// `StepError::Halted` until `reset` is called.
    pub fn step(&mut self) -> Result<(), StepError> {
        if self.state == ExecutionState::Halted {
            return Err(StepError::Halted);
        }

        self.cpu.step().map_err(|err| {
            debug!(%err, "fatal fault, halting");
            self.state = ExecutionState::Halted;
            err
        })
    }

    /// Tick the 60 Hz timers once.
    pub fn tick_timers(&mut self) {
        self.cpu.decrement_timers();
    }

    /// Run one 60 Hz frame.
    ///
    /// Executes `instructions_per_frame` steps, then ticks the timers.
    /// Stops early on a fault; the timers tick regardless so a halted
    /// frame still advances time.
    pub fn frame(&mut self) -> Result<(), StepError> {
        let mut result = Ok(());

        for _ in 0..self.instructions_per_frame {
            if let Err(err) = self.step() {
                result = Err(err);
                break;
            }
        }

        self.tick_timers();
        result
    }

    /// Set key state.
    ///
    /// # Arguments
    ///
    /// * `key` - Key index (0x0..0xF).
    /// * `down` - Pressed state.
    ///
    pub fn set_key(&mut self, key: C8RegIdx, down: bool) {
        self.cpu.peripherals.input.set_key(key, down);
    }

    /// Get the framebuffer.
    ///
    /// 2048 booleans, row-major, 64 wide, origin top-left.
    pub fn framebuffer(&self) -> &[bool; VIDEO_MEMORY_SIZE] {
        self.cpu.peripherals.screen.get_data()
    }

    /// Check if a tone should play.
    pub fn sound_active(&self) -> bool {
        self.cpu.sound_active()
    }

    /// Get delay timer value.
    pub fn delay_timer(&self) -> C8Byte {
        self.cpu.delay_timer.get_value()
    }

    /// Get sound timer value.
    pub fn sound_timer(&self) -> C8Byte {
        self.cpu.sound_timer.get_value()
    }

    /// Get execution state.
    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Reset the machine.
    ///
    /// Re-zeroes registers, stack, framebuffer, keypad and timers,
    /// reloads the font and the retained ROM bytes, and sets PC back to
    /// 0x200.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.cpu.load_font_in_memory();

        // Retained copy always fits; the size was checked on load.
        self.cpu
            .peripherals
            .memory
            .write_data_at_offset(ROM_START_ADDR, &self.rom);

        self.state = ExecutionState::Running;

        debug!("machine reset");
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
