//! CPU.

use std::fmt;

use tracing::{trace, warn};

use super::{
    font::Font,
    opcodes::{self, OpCode},
    quirks::Quirks,
    registers::Registers,
    rng::{QuadRandSource, RandomSource},
    stack::Stack,
    timer::Timer,
    types::{C8Addr, C8Byte, C8RegIdx},
};
use crate::{errors::StepError, peripherals::Peripherals};

/// Maximum sprite height in rows.
const MAX_SPRITE_HEIGHT: usize = 15;

/// CHIP-8 CPU.
pub struct Cpu {
    /// Peripherals.
    pub peripherals: Peripherals,

    /// Registers.
    pub registers: Registers,
    /// Stack.
    pub stack: Stack,

    /// Delay timer.
    pub delay_timer: Timer,
    /// Sound timer.
    pub sound_timer: Timer,

    /// Quirk configuration.
    pub quirks: Quirks,
    /// Instruction count.
    pub instruction_count: usize,

    font: Font,
    rng: Box<dyn RandomSource>,
}

impl Cpu {
    /// Create CHIP-8 CPU.
    ///
    /// Initialize with default parameters.
    pub fn new() -> Self {
        Cpu {
            peripherals: Peripherals::new(),

            registers: Registers::new(),
            stack: Stack::new(),

            delay_timer: Timer::new("Delay"),
            sound_timer: Timer::new("Sound"),

            quirks: Quirks::default(),
            instruction_count: 0,

            font: Font::new_system_font(),
            rng: Box::new(QuadRandSource::new()),
        }
    }

    /// Replace the random byte source.
    ///
    /// # Arguments
    ///
    /// * `rng` - Random source.
    ///
    pub fn set_random_source(&mut self, rng: Box<dyn RandomSource>) {
        self.rng = rng;
    }

    /// Load font in memory.
    pub fn load_font_in_memory(&mut self) {
        self.peripherals
            .memory
            .write_data_at_offset(super::font::FONT_DATA_ADDR, self.font.get_data());
    }

    /// Decrement timers.
    pub fn decrement_timers(&mut self) {
        self.delay_timer.decrement();
        self.sound_timer.decrement();
    }

    /// Check if the sound timer is driving a tone.
    pub fn sound_active(&self) -> bool {
        self.sound_timer.active()
    }

    /// Reset CPU.
    pub fn reset(&mut self) {
        // Reset peripherals.
        self.peripherals.reset();

        // Reset components.
        self.registers.reset();
        self.stack.reset();
        self.delay_timer.reset(0);
        self.sound_timer.reset(0);
        self.instruction_count = 0;
    }

    /// Fetch, decode and execute one instruction.
    ///
    /// The program counter is advanced past the fetched word before
    /// execution, so jumps and skips operate on the next address.
    pub fn step(&mut self) -> Result<(), StepError> {
        let pc = self.registers.get_pc();
        let opcode = self.peripherals.memory.read_opcode_at_address(pc);
        self.registers.advance_pc();

        let opcode_enum = opcodes::get_opcode_enum(opcode);
        trace!(
            pc = format_args!("{:04X}", pc),
            assembly = %opcodes::get_opcode_str(&opcode_enum).0,
            "executing instruction"
        );

        self.execute_instruction(&opcode_enum)?;
        self.instruction_count += 1;

        Ok(())
    }

    /// Execute instruction.
    ///
    /// # Arguments
    ///
    /// * `opcode` - Instruction to execute.
    ///
    pub fn execute_instruction(&mut self, opcode: &OpCode) -> Result<(), StepError> {
        match *opcode {
            OpCode::SYS(_addr) => {
                // Do nothing.
            }
            OpCode::CLS => {
                // Clear screen.
                self.peripherals.screen.clear_screen();
            }
            OpCode::RET => {
                // Get last stored address.
                let addr = self.stack.pop().map_err(StepError::StackFault)?;
                self.registers.set_pc(addr);
            }
            OpCode::JP(addr) => {
                // Set PC to address.
                self.registers.set_pc(addr);
            }
            OpCode::CALL(addr) => {
                // Store return address and set PC.
                let ret = self.registers.get_pc();
                self.stack.push(ret).map_err(StepError::StackFault)?;
                self.registers.set_pc(addr);
            }
            OpCode::SEByte(reg, byte) => {
                // Compare register with byte, then skip.
                let r = self.registers.get_register(reg);

                if r == byte {
                    self.registers.advance_pc();
                }
            }
            OpCode::SNEByte(reg, byte) => {
                // Compare register with byte, then skip.
                let r = self.registers.get_register(reg);

                if r != byte {
                    self.registers.advance_pc();
                }
            }
            OpCode::SE(reg1, reg2) => {
                // Compare register values.
                let r1 = self.registers.get_register(reg1);
                let r2 = self.registers.get_register(reg2);

                if r1 == r2 {
                    self.registers.advance_pc();
                }
            }
            OpCode::LDByte(reg, byte) => {
                // Puts byte in register.
                self.registers.set_register(reg, byte);
            }
            OpCode::ADDByte(reg, byte) => {
                // Add byte in register. VF untouched.
                let r = self.registers.get_register(reg);
                let res = r.wrapping_add(byte);

                self.registers.set_register(reg, res);
            }
            OpCode::LD(reg1, reg2) => {
                // Load register value in another.
                let r = self.registers.get_register(reg2);

                self.registers.set_register(reg1, r);
            }
            OpCode::OR(reg1, reg2) => {
                // OR between two registers.
                let r1 = self.registers.get_register(reg1);
                let r2 = self.registers.get_register(reg2);

                self.registers.set_register(reg1, r1 | r2);
            }
            OpCode::AND(reg1, reg2) => {
                // AND between two registers.
                let r1 = self.registers.get_register(reg1);
                let r2 = self.registers.get_register(reg2);

                self.registers.set_register(reg1, r1 & r2);
            }
            OpCode::XOR(reg1, reg2) => {
                // XOR between two registers.
                let r1 = self.registers.get_register(reg1);
                let r2 = self.registers.get_register(reg2);

                self.registers.set_register(reg1, r1 ^ r2);
            }
            OpCode::ADD(reg1, reg2) => {
                // ADD between two registers.
                // Result first, flag second: an opcode targeting VF ends
                // with VF holding the flag.
                let r1 = self.registers.get_register(reg1);
                let r2 = self.registers.get_register(reg2);
                let (res, overflow) = r1.overflowing_add(r2);

                self.registers.set_register(reg1, res);
                self.registers.set_carry_register(overflow as C8Byte);
            }
            OpCode::SUB(reg1, reg2) => {
                // SUB between two registers. VF = NOT borrow.
                let r1 = self.registers.get_register(reg1);
                let r2 = self.registers.get_register(reg2);
                let res = r1.wrapping_sub(r2);

                self.registers.set_register(reg1, res);
                self.registers.set_carry_register((r1 >= r2) as C8Byte);
            }
            OpCode::SHR(reg1, reg2) => {
                // Shift right register. VF = dropped bit.
                let r = if self.quirks.shift_reads_vy {
                    self.registers.get_register(reg2)
                } else {
                    self.registers.get_register(reg1)
                };

                self.registers.set_register(reg1, r >> 1);
                self.registers.set_carry_register(r & 1);
            }
            OpCode::SUBN(reg1, reg2) => {
                // SUBN between two registers. VF = NOT borrow.
                let r1 = self.registers.get_register(reg1);
                let r2 = self.registers.get_register(reg2);
                let res = r2.wrapping_sub(r1);

                self.registers.set_register(reg1, res);
                self.registers.set_carry_register((r2 >= r1) as C8Byte);
            }
            OpCode::SHL(reg1, reg2) => {
                // Shift left register. VF = dropped bit.
                let r = if self.quirks.shift_reads_vy {
                    self.registers.get_register(reg2)
                } else {
                    self.registers.get_register(reg1)
                };

                self.registers.set_register(reg1, r << 1);
                self.registers.set_carry_register((r >> 7) & 1);
            }
            OpCode::SNE(reg1, reg2) => {
                // Skip if registers are not equal.
                let r1 = self.registers.get_register(reg1);
                let r2 = self.registers.get_register(reg2);

                if r1 != r2 {
                    self.registers.advance_pc();
                }
            }
            OpCode::LDI(addr) => {
                // Set I to addr.
                self.registers.set_i_register(addr);
            }
            OpCode::JP0(addr) => {
                // Set PC to address + V0. Target wraps to 12 bits.
                let reg = if self.quirks.jump_uses_vx {
                    ((addr >> 8) & 0xF) as C8RegIdx
                } else {
                    0
                };
                let offset = C8Addr::from(self.registers.get_register(reg));

                self.registers.set_pc(addr.wrapping_add(offset));
            }
            OpCode::RND(reg, byte) => {
                // Set random value AND byte in register.
                let rand_value = self.rng.random_byte() & byte;

                self.registers.set_register(reg, rand_value);
            }
            OpCode::DRW(reg1, reg2, byte) => {
                // Draw sprite.
                let r1 = self.registers.get_register(reg1);
                let r2 = self.registers.get_register(reg2);
                let ri = self.registers.get_i_register();
                let rows = (byte as usize).min(MAX_SPRITE_HEIGHT);

                let mut sprite = [0; MAX_SPRITE_HEIGHT];
                for (idx, row) in sprite.iter_mut().enumerate().take(rows) {
                    *row = self
                        .peripherals
                        .memory
                        .read_byte_at_offset(ri.wrapping_add(idx as C8Addr));
                }

                let collision = self.peripherals.screen.draw_sprite(r1, r2, &sprite[..rows]);
                self.registers.set_carry_register(collision as C8Byte);
            }
            OpCode::SKP(reg) => {
                // Skip next instruction if key is pressed.
                let r = self.registers.get_register(reg);

                if self.peripherals.input.get(r) {
                    self.registers.advance_pc();
                }
            }
            OpCode::SKNP(reg) => {
                // Skip next instruction if key is not pressed.
                let r = self.registers.get_register(reg);

                if !self.peripherals.input.get(r) {
                    self.registers.advance_pc();
                }
            }
            OpCode::LDGetDelayTimer(reg) => {
                // Get delay timer and set register.
                let dt = self.delay_timer.get_value();

                self.registers.set_register(reg, dt);
            }
            OpCode::LDGetKey(reg) => {
                // Wait for input: rewind PC until a key is down, then
                // store the lowest pressed key. Timers keep ticking.
                match self.peripherals.input.first_pressed() {
                    Some(key) => self.registers.set_register(reg, key),
                    None => self.registers.rewind_pc(),
                }
            }
            OpCode::LDSetDelayTimer(reg) => {
                // Set delay timer value from register.
                let r = self.registers.get_register(reg);
                self.delay_timer.reset(r);
            }
            OpCode::LDSetSoundTimer(reg) => {
                // Set sound timer value from register.
                let r = self.registers.get_register(reg);
                self.sound_timer.reset(r);
            }
            OpCode::ADDI(reg) => {
                // Add register value to I. VF untouched.
                let i = self.registers.get_i_register();
                let r = self.registers.get_register(reg);

                self.registers.set_i_register(i.wrapping_add(C8Addr::from(r)));
            }
            OpCode::LDSprite(reg) => {
                // Set I = location of glyph for reg.
                let r = self.registers.get_register(reg);

                self.registers.set_i_register(Font::glyph_addr(r));
            }
            OpCode::LDBCD(reg) => {
                // Store BCD repr of reg in I, I+1, I+2.
                let r = self.registers.get_register(reg);
                let i = self.registers.get_i_register();

                let n3 = r / 100;
                let n2 = (r / 10) % 10;
                let n1 = r % 10;

                self.peripherals.memory.write_data_at_offset(i, &[n3, n2, n1]);
            }
            OpCode::LDS(reg) => {
                // Store registers V0 through reg in memory starting at I.
                let ri = self.registers.get_i_register();

                for ridx in 0..=reg {
                    let r = self.registers.get_register(ridx);
                    self.peripherals
                        .memory
                        .write_byte_at_offset(ri.wrapping_add(C8Addr::from(ridx)), r);
                }

                if self.quirks.load_store_bumps_i {
                    self.registers
                        .set_i_register(ri.wrapping_add(C8Addr::from(reg) + 1));
                }
            }
            OpCode::LDR(reg) => {
                // Read registers V0 through reg from memory starting at I.
                let ri = self.registers.get_i_register();

                for ridx in 0..=reg {
                    let byte = self
                        .peripherals
                        .memory
                        .read_byte_at_offset(ri.wrapping_add(C8Addr::from(ridx)));
                    self.registers.set_register(ridx, byte);
                }

                if self.quirks.load_store_bumps_i {
                    self.registers
                        .set_i_register(ri.wrapping_add(C8Addr::from(reg) + 1));
                }
            }
            OpCode::DATA(word) => {
                // Unrecognized word: soft no-op.
                warn!(
                    opcode = format_args!("{:04X}", word),
                    "unrecognized opcode, ignoring"
                );
            }
        };

        Ok(())
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CPU {{")?;

        writeln!(f, "  memory: {{")?;
        write!(f, "{:?}", self.peripherals.memory)?;
        writeln!(f, "  }},")?;

        writeln!(f, "  screen: {{")?;
        write!(f, "{:?}", self.peripherals.screen)?;
        writeln!(f, "  }},")?;

        writeln!(f, "  registers: {{")?;
        write!(f, "{:?}", self.registers)?;
        writeln!(f, "  }},")?;

        writeln!(f, "  stack: {{")?;
        write!(f, "{:?}", self.stack)?;
        writeln!(f, "  }},")?;

        writeln!(f, "  input: {{")?;
        write!(f, "{:?}", self.peripherals.input)?;
        writeln!(f, "  }},")?;

        writeln!(f, "  delay_timer: {:?},", self.delay_timer)?;
        writeln!(f, "  sound_timer: {:?}", self.sound_timer)?;

        writeln!(f, "}}")
    }
}
