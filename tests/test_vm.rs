//! Virtual machine façade behavior.

use chip8_vm::errors::{RomError, StackError, StepError};
use chip8_vm::peripherals::memory::MAX_ROM_SIZE;
use chip8_vm::vm::{ExecutionState, Vm};

#[test]
fn test_initial_state() {
    let vm = Vm::new();

    assert_eq!(vm.cpu.registers.get_pc(), 0x200);
    assert_eq!(vm.state(), ExecutionState::Running);
    assert_eq!(vm.framebuffer().len(), 2048);
    assert!(vm.framebuffer().iter().all(|px| !px));
    assert!(!vm.sound_active());

    // Font glyph "0" sits at address 0.
    assert_eq!(vm.cpu.peripherals.memory.read_byte_at_offset(0x000), 0xF0);
    assert_eq!(vm.cpu.peripherals.memory.read_byte_at_offset(0x04F), 0x80);
}

#[test]
fn test_load_rom_too_large() {
    let mut vm = Vm::new();
    let rom = vec![0; MAX_ROM_SIZE + 1];

    assert_eq!(
        vm.load_rom(&rom),
        Err(RomError::RomTooLarge {
            size: MAX_ROM_SIZE + 1,
            max: MAX_ROM_SIZE
        })
    );
}

#[test]
fn test_stack_underflow_halts() {
    // RET with an empty stack.
    let mut vm = Vm::new();
    vm.load_rom(&[0x00, 0xEE]).unwrap();

    assert_eq!(
        vm.step(),
        Err(StepError::StackFault(StackError::Underflow))
    );
    assert_eq!(vm.state(), ExecutionState::Halted);

    // Halted machine refuses to step.
    assert_eq!(vm.step(), Err(StepError::Halted));
}

#[test]
fn test_stack_overflow_halts() {
    // CALL 0x200 forever: 16 frames fit, the 17th call faults.
    let mut vm = Vm::new();
    vm.load_rom(&[0x22, 0x00]).unwrap();

    for _ in 0..16 {
        vm.step().unwrap();
    }

    assert_eq!(
        vm.step(),
        Err(StepError::StackFault(StackError::Overflow(16)))
    );
    assert_eq!(vm.state(), ExecutionState::Halted);
}

#[test]
fn test_reset_recovers_from_halt() {
    let mut vm = Vm::new();
    vm.load_rom(&[0x00, 0xEE]).unwrap();

    assert!(vm.step().is_err());
    assert_eq!(vm.state(), ExecutionState::Halted);

    vm.reset();
    assert_eq!(vm.state(), ExecutionState::Running);
    assert_eq!(vm.cpu.registers.get_pc(), 0x200);

    // The ROM is still in place, so the same fault reproduces.
    assert_eq!(
        vm.step(),
        Err(StepError::StackFault(StackError::Underflow))
    );
}

#[test]
fn test_reset_rezeroes_state_and_keeps_rom() {
    let mut vm = Vm::new();
    // V0 = AA, ST = V0, draw a glyph.
    vm.load_rom(&[0x60, 0xAA, 0xF0, 0x18, 0xA0, 0x00, 0xD0, 0x15])
        .unwrap();
    vm.set_key(0x3, true);

    for _ in 0..4 {
        vm.step().unwrap();
    }
    assert!(vm.sound_active());
    assert!(vm.framebuffer().iter().any(|&px| px));

    vm.reset();

    assert_eq!(vm.cpu.registers.get_pc(), 0x200);
    assert_eq!(vm.cpu.registers.get_register(0x0), 0);
    assert_eq!(vm.sound_timer(), 0);
    assert!(!vm.sound_active());
    assert!(vm.framebuffer().iter().all(|px| !px));
    assert!(!vm.cpu.peripherals.input.get(0x3));

    // ROM and font are reloaded.
    assert_eq!(vm.cpu.peripherals.memory.read_byte_at_offset(0x200), 0x60);
    assert_eq!(vm.cpu.peripherals.memory.read_byte_at_offset(0x000), 0xF0);

    // The program runs again from scratch.
    vm.step().unwrap();
    assert_eq!(vm.cpu.registers.get_register(0x0), 0xAA);
}

#[test]
fn test_tick_timers() {
    let mut vm = Vm::new();
    // V0 = 02, DT = V0, ST = V0.
    vm.load_rom(&[0x60, 0x02, 0xF0, 0x15, 0xF0, 0x18]).unwrap();
    for _ in 0..3 {
        vm.step().unwrap();
    }

    assert_eq!(vm.delay_timer(), 2);
    assert_eq!(vm.sound_timer(), 2);
    assert!(vm.sound_active());

    vm.tick_timers();
    assert_eq!(vm.delay_timer(), 1);
    assert_eq!(vm.sound_timer(), 1);
    assert!(vm.sound_active());

    vm.tick_timers();
    assert_eq!(vm.delay_timer(), 0);
    assert_eq!(vm.sound_timer(), 0);
    assert!(!vm.sound_active());

    // Timers stay at zero.
    vm.tick_timers();
    assert_eq!(vm.delay_timer(), 0);
    assert_eq!(vm.sound_timer(), 0);
}

#[test]
fn test_steps_do_not_tick_timers() {
    let mut vm = Vm::new();
    vm.load_rom(&[0x60, 0x05, 0xF0, 0x15, 0x12, 0x04]).unwrap();
    for _ in 0..10 {
        vm.step().unwrap();
    }

    assert_eq!(vm.delay_timer(), 5);
}

#[test]
fn test_frame_runs_steps_then_ticks() {
    let mut vm = Vm::new();
    vm.set_instructions_per_frame(4);
    // DT = 10 set up front, then an idle jump loop.
    vm.load_rom(&[0x60, 0x0A, 0xF0, 0x15, 0x12, 0x04]).unwrap();

    vm.frame().unwrap();
    assert_eq!(vm.cpu.instruction_count, 4);
    assert_eq!(vm.delay_timer(), 9);

    vm.frame().unwrap();
    assert_eq!(vm.cpu.instruction_count, 8);
    assert_eq!(vm.delay_timer(), 8);
}

#[test]
fn test_frame_ticks_timers_even_on_fault() {
    let mut vm = Vm::new();
    // DT = 10, then RET on an empty stack.
    vm.load_rom(&[0x60, 0x0A, 0xF0, 0x15, 0x00, 0xEE]).unwrap();

    let result = vm.frame();
    assert_eq!(result, Err(StepError::StackFault(StackError::Underflow)));
    assert_eq!(vm.state(), ExecutionState::Halted);
    assert_eq!(vm.delay_timer(), 9);
}

#[test]
fn test_timers_tick_during_key_wait() {
    let mut vm = Vm::new();
    vm.set_instructions_per_frame(2);
    // DT = 3, then wait for a key.
    vm.load_rom(&[0x60, 0x03, 0xF0, 0x15, 0xF0, 0x0A]).unwrap();

    vm.frame().unwrap();
    vm.frame().unwrap();

    // Still waiting, but time passed.
    assert_eq!(vm.cpu.registers.get_pc(), 0x204);
    assert_eq!(vm.delay_timer(), 1);

    vm.set_key(0x2, true);
    vm.frame().unwrap();
    assert_eq!(vm.cpu.registers.get_register(0x0), 0x02);
}

#[test]
fn test_key_release() {
    let mut vm = Vm::new();
    vm.set_key(0x5, true);
    assert!(vm.cpu.peripherals.input.get(0x5));

    vm.set_key(0x5, false);
    assert!(!vm.cpu.peripherals.input.get(0x5));
}

#[test]
fn test_halted_frame_reports_halt() {
    let mut vm = Vm::new();
    vm.load_rom(&[0x00, 0xEE]).unwrap();

    let _ = vm.frame();
    assert_eq!(vm.frame(), Err(StepError::Halted));
}

#[test]
fn test_register_invariants_after_random_program() {
    // A ROM of arithmetic churn; registers stay 8-bit, PC stays in
    // memory range, the framebuffer keeps its size.
    let mut vm = Vm::new();
    vm.load_rom(&[
        0x6A, 0xFF, 0x7A, 0xFF, 0x8A, 0xA4, 0x8A, 0xAE, 0xAF, 0xFF, 0xF0, 0x1E, 0x12, 0x00,
    ])
    .unwrap();

    for _ in 0..100 {
        vm.step().unwrap();
        assert!(vm.cpu.registers.get_pc() < 0x1000);
        assert!(vm.cpu.stack.get_pointer() <= 16);
        assert_eq!(vm.framebuffer().len(), 2048);
    }
}
