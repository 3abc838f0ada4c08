//! # Machine Thread
//!
//! Dedicated thread that owns the whole emulated machine, talking to
//! the embedding side over lock-free SPSC channels: commands flow in,
//! state snapshots and finished frames flow out. Nothing here blocks
//! indefinitely; commands are fire-and-forget and shutdown is a
//! cooperative flag checked between steps.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub use crate::cpu::hardware::joypad::Button;
use crate::cpu::registers::{Reg16, Registers};
use crate::gameboy::GameBoy;
use crate::render::{FrameBuffer, TileViewBuffer};

/// Steps to run between command polls. Only affects responsiveness to
/// pause/step commands.
const STEPS_PER_BATCH: u32 = 2000;

/// Wall-clock length of one emulated frame (17,556 machine cycles at
/// the DMG clock).
const FRAME_DURATION: Duration = Duration::from_micros(16_743);

/// Channel buffer sizes
const COMMAND_BUFFER_SIZE: usize = 64;
const EVENT_BUFFER_SIZE: usize = 64;

/// Commands sent into the machine thread.
#[derive(Debug, Clone)]
pub enum MachineCommand {
    /// Run continuously until paused.
    Run,
    /// Pause execution.
    Pause,
    /// Run exactly N steps, then pause.
    Step(u32),
    /// Reinitialize every component, keeping the loaded ROM.
    Reset,
    /// Update one button's pressed state.
    SetButton { button: Button, pressed: bool },
    /// Request a register/state snapshot.
    RequestState,
    /// Request a render of the tile cache debug view.
    RequestTileView,
    /// Stop the machine thread.
    Shutdown,
}

/// Events flowing back out of the machine thread.
#[derive(Debug)]
pub enum MachineEvent {
    State(MachineState),
    /// A finished frame, sent on every vertical blank entry.
    Frame(Box<FrameBuffer>),
    TileView(Box<TileViewBuffer>),
    Paused { reason: PauseReason },
}

/// Register snapshot for display overlays.
#[derive(Debug, Clone, Default)]
pub struct MachineState {
    pub af: u16,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub sp: u16,
    pub pc: u16,
    pub ime: bool,
    pub halted: bool,
    /// Retired steps so far.
    pub cycle: u64,
    pub is_running: bool,
    pub cartridge_title: String,
}

#[derive(Debug, Clone, Copy)]
pub enum PauseReason {
    /// Requested from outside.
    User,
    /// A `Step` command ran its full count.
    Step,
}

/// The thread side: owns the machine, drains commands, paces frames.
struct MachineThread {
    gb: GameBoy,
    command_rx: rtrb::Consumer<MachineCommand>,
    event_tx: rtrb::Producer<MachineEvent>,

    running: bool,
    steps_remaining: u32,
    next_frame_deadline: Instant,
}

impl MachineThread {
    fn new(
        gb: GameBoy,
        command_rx: rtrb::Consumer<MachineCommand>,
        event_tx: rtrb::Producer<MachineEvent>,
    ) -> Self {
        Self {
            gb,
            command_rx,
            event_tx,
            running: false,
            steps_remaining: 0,
            next_frame_deadline: Instant::now() + FRAME_DURATION,
        }
    }

    fn run(mut self) {
        loop {
            if self.process_commands() {
                logger::flush();
                return;
            }

            if self.running || self.steps_remaining > 0 {
                self.execute_batch();
            } else {
                // parked; avoid busy-waiting
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    /// Drains pending commands. Returns true on shutdown.
    fn process_commands(&mut self) -> bool {
        while let Ok(command) = self.command_rx.pop() {
            match command {
                MachineCommand::Run => {
                    self.running = true;
                    self.steps_remaining = 0;
                    self.next_frame_deadline = Instant::now() + FRAME_DURATION;
                }
                MachineCommand::Pause => {
                    self.running = false;
                    self.steps_remaining = 0;
                    self.send_event(MachineEvent::Paused {
                        reason: PauseReason::User,
                    });
                    self.send_state();
                }
                MachineCommand::Step(count) => {
                    self.running = false;
                    self.steps_remaining = count;
                }
                MachineCommand::Reset => {
                    self.gb.reset();
                    self.send_state();
                }
                MachineCommand::SetButton { button, pressed } => {
                    self.gb.set_button(button, pressed);
                }
                MachineCommand::RequestState => self.send_state(),
                MachineCommand::RequestTileView => {
                    let view = self.gb.tile_view();
                    self.send_event(MachineEvent::TileView(view));
                }
                MachineCommand::Shutdown => return true,
            }
        }
        false
    }

    fn execute_batch(&mut self) {
        for _ in 0..STEPS_PER_BATCH {
            let frame_done = self.gb.step();

            if frame_done {
                self.send_frame();
                self.send_state();
                if self.running {
                    self.pace();
                }
            }

            if self.steps_remaining > 0 {
                self.steps_remaining -= 1;
                if self.steps_remaining == 0 {
                    self.send_event(MachineEvent::Paused {
                        reason: PauseReason::Step,
                    });
                    self.send_state();
                    return;
                }
            }
        }
    }

    /// Sleeps off the rest of the frame period. When the emulation
    /// falls behind, the schedule resynchronizes instead of trying to
    /// catch up.
    fn pace(&mut self) {
        let now = Instant::now();
        if let Some(remaining) = self.next_frame_deadline.checked_duration_since(now) {
            thread::sleep(remaining);
            self.next_frame_deadline += FRAME_DURATION;
        } else {
            self.next_frame_deadline = now + FRAME_DURATION;
        }
    }

    fn send_state(&mut self) {
        let state = snapshot(self.gb.registers(), &self.gb, self.running);
        self.send_event(MachineEvent::State(state));
    }

    fn send_frame(&mut self) {
        let frame = Box::new(*self.gb.frame());
        self.send_event(MachineEvent::Frame(frame));
    }

    /// Non-blocking; events are dropped when the consumer lags.
    fn send_event(&mut self, event: MachineEvent) {
        let _ = self.event_tx.push(event);
    }
}

fn snapshot(registers: &Registers, gb: &GameBoy, is_running: bool) -> MachineState {
    MachineState {
        af: registers.get16(Reg16::AF),
        bc: registers.get16(Reg16::BC),
        de: registers.get16(Reg16::DE),
        hl: registers.get16(Reg16::HL),
        sp: registers.sp,
        pc: registers.pc,
        ime: registers.ime,
        halted: registers.halted,
        cycle: registers.cycle_count,
        is_running,
        cartridge_title: gb.cartridge().game_title().to_string(),
    }
}

/// Handle held by the embedding side.
pub struct MachineHandle {
    command_tx: rtrb::Producer<MachineCommand>,
    event_rx: rtrb::Consumer<MachineEvent>,
    thread_handle: Option<JoinHandle<()>>,

    /// Latest state snapshot received from the machine.
    pub state: MachineState,
    /// Latest finished frame.
    pub frame: Option<Box<FrameBuffer>>,
    /// Latest tile cache view.
    pub tile_view: Option<Box<TileViewBuffer>>,
    /// Set when a `Paused` event arrived since the last poll.
    pub pause_seen: bool,
}

impl MachineHandle {
    pub fn send(&mut self, command: MachineCommand) {
        let _ = self.command_tx.push(command);
    }

    /// Drains pending events into the cached state.
    pub fn poll(&mut self) {
        while let Ok(event) = self.event_rx.pop() {
            match event {
                MachineEvent::State(state) => self.state = state,
                MachineEvent::Frame(frame) => self.frame = Some(frame),
                MachineEvent::TileView(view) => self.tile_view = Some(view),
                MachineEvent::Paused { reason: _ } => {
                    self.state.is_running = false;
                    self.pause_seen = true;
                }
            }
        }
    }
}

impl Drop for MachineHandle {
    fn drop(&mut self) {
        let _ = self.command_tx.push(MachineCommand::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Spawns the machine thread; the machine moves in, the handle is the
/// only way to talk to it afterwards.
#[must_use]
pub fn spawn(gb: GameBoy) -> MachineHandle {
    let (command_tx, command_rx) = rtrb::RingBuffer::new(COMMAND_BUFFER_SIZE);
    let (event_tx, event_rx) = rtrb::RingBuffer::new(EVENT_BUFFER_SIZE);

    let initial_state = snapshot(gb.registers(), &gb, false);

    let thread_handle = thread::spawn(move || {
        MachineThread::new(gb, command_rx, event_tx).run();
    });

    MachineHandle {
        command_tx,
        event_rx,
        thread_handle: Some(thread_handle),
        state: initial_state,
        frame: None,
        tile_view: None,
        pause_seen: false,
    }
}
