//! Cycle pacing and the emulator control surface.
//!
//! The CPU runs on its own producer thread; consumers observe state
//! between instructions through a mutex held only across whole steps.
//! Control traffic goes through a single-consumer command queue drained at
//! tick boundaries, so a Reset during Run is always delivered at a safe
//! point. Pacing uses a monotonic next-deadline scheme (`next += period`)
//! rather than accumulated deltas, which keeps long-run drift bounded;
//! cycles the host falls behind on are worked off, never skipped.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::io::IoDevice;
use crate::runtime::{Cpu, Fault, Flag, RegValue};

/// Nominal clock rate; one cycle per period.
pub const DEFAULT_CLOCK_HZ: f64 = 3_072_000.0;

/// Largest backlog worked off per lock acquisition, so readers are never
/// starved while the scheduler catches up.
const MAX_BATCH: u32 = 10_000;

/// Control messages, applied between instructions.
pub enum Command {
    Run,
    Pause,
    /// Execute exactly one instruction, ignoring the clock
    Step,
    Reset,
    Load { image: Vec<u8>, origin: u16 },
    Poke { addr: u16, value: u8 },
    WritePort { port: u8, value: u8 },
    Interrupt { vector: u8 },
    SetClockHz(f64),
    /// Reply once every command before this one has been applied
    Sync(mpsc::Sender<()>),
    Shutdown,
}

struct Shared {
    cpu: Mutex<Cpu>,
    running: AtomicBool,
    halted: AtomicBool,
}

/// Handle to a CPU running on its scheduler thread.
pub struct Emulator {
    shared: Arc<Shared>,
    cmds: mpsc::Sender<Command>,
    thread: Option<JoinHandle<()>>,
}

impl Emulator {
    pub fn spawn(cpu: Cpu) -> Emulator {
        let shared = Arc::new(Shared {
            cpu: Mutex::new(cpu),
            running: AtomicBool::new(false),
            halted: AtomicBool::new(false),
        });
        let (tx, rx) = mpsc::channel();
        let thread = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("cpu-sched".into())
                .spawn(move || scheduler(shared, rx))
                .expect("failed to spawn scheduler thread")
        };
        Emulator {
            shared,
            cmds: tx,
            thread: Some(thread),
        }
    }

    fn command(&self, cmd: Command) {
        // A send only fails after shutdown, when there is nothing to do
        let _ = self.cmds.send(cmd);
    }

    /// Free-run at the configured clock rate
    pub fn run(&self) {
        self.command(Command::Run);
    }

    pub fn pause(&self) {
        self.command(Command::Pause);
    }

    pub fn step(&self) {
        self.command(Command::Step);
    }

    pub fn reset(&self) {
        self.command(Command::Reset);
    }

    pub fn load(&self, image: Vec<u8>, origin: u16) {
        self.command(Command::Load { image, origin });
    }

    pub fn poke(&self, addr: u16, value: u8) {
        self.command(Command::Poke { addr, value });
    }

    pub fn write_port(&self, port: u8, value: u8) {
        self.command(Command::WritePort { port, value });
    }

    pub fn request_interrupt(&self, vector: u8) {
        self.command(Command::Interrupt { vector });
    }

    pub fn set_clock_hz(&self, hz: f64) {
        self.command(Command::SetClockHz(hz));
    }

    /// Block until all previously sent commands have been applied
    pub fn sync(&self) {
        let (tx, rx) = mpsc::channel();
        self.command(Command::Sync(tx));
        let _ = rx.recv();
    }

    /// Snapshot access between instructions
    pub fn with_cpu<R>(&self, f: impl FnOnce(&Cpu) -> R) -> R {
        let cpu = self.shared.cpu.lock().unwrap();
        f(&cpu)
    }

    pub fn register(&self, name: &str) -> Option<RegValue> {
        self.with_cpu(|cpu| cpu.register(name))
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.with_cpu(|cpu| cpu.flag(flag))
    }

    pub fn memory_slice(&self, range: Range<usize>) -> Vec<u8> {
        self.with_cpu(|cpu| cpu.memory_slice(range).to_vec())
    }

    pub fn is_halted(&self) -> bool {
        self.shared.halted.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn fault(&self) -> Option<Fault> {
        self.with_cpu(|cpu| cpu.fault())
    }

    /// Attach a device before starting the program; forwards the bus's
    /// overlap rejection.
    pub fn attach_io(
        &self,
        ports: std::ops::RangeInclusive<u8>,
        device: Box<dyn IoDevice>,
    ) -> Result<(), std::ops::RangeInclusive<u8>> {
        let mut cpu = self.shared.cpu.lock().unwrap();
        cpu.io_mut().attach(ports, device)
    }

    /// Stop the scheduler at the next tick boundary and reclaim the CPU.
    pub fn shutdown(mut self) -> Cpu {
        self.command(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        Arc::try_unwrap(std::mem::replace(
            &mut self.shared,
            Arc::new(Shared {
                cpu: Mutex::new(Cpu::default()),
                running: AtomicBool::new(false),
                halted: AtomicBool::new(false),
            }),
        ))
        .map(|shared| shared.cpu.into_inner().unwrap())
        .unwrap_or_else(|_| Cpu::default())
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        let _ = self.cmds.send(Command::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn scheduler(shared: Arc<Shared>, rx: mpsc::Receiver<Command>) {
    let mut period = Duration::from_secs_f64(1.0 / DEFAULT_CLOCK_HZ);
    let mut next = Instant::now();

    loop {
        // Drain the queue at the tick boundary; block while paused so an
        // idle emulator costs nothing.
        loop {
            let cmd = if shared.running.load(Ordering::Acquire) {
                match rx.try_recv() {
                    Ok(cmd) => cmd,
                    Err(mpsc::TryRecvError::Empty) => break,
                    Err(mpsc::TryRecvError::Disconnected) => return,
                }
            } else {
                match rx.recv() {
                    Ok(cmd) => cmd,
                    Err(_) => return,
                }
            };

            match cmd {
                Command::Run => {
                    trace!("run");
                    shared.running.store(true, Ordering::Release);
                    next = Instant::now();
                }
                Command::Pause => {
                    trace!("pause");
                    shared.running.store(false, Ordering::Release);
                }
                Command::Step => {
                    let mut cpu = shared.cpu.lock().unwrap();
                    cpu.pending_cycles = 0;
                    cpu.step();
                    publish(&shared, &cpu);
                }
                Command::Reset => {
                    trace!("reset");
                    let mut cpu = shared.cpu.lock().unwrap();
                    cpu.reset();
                    publish(&shared, &cpu);
                }
                Command::Load { image, origin } => {
                    let mut cpu = shared.cpu.lock().unwrap();
                    cpu.load(&image, origin);
                    publish(&shared, &cpu);
                }
                Command::Poke { addr, value } => {
                    shared.cpu.lock().unwrap().poke(addr, value);
                }
                Command::WritePort { port, value } => {
                    shared.cpu.lock().unwrap().io_mut().write(port, value);
                }
                Command::Interrupt { vector } => {
                    let mut cpu = shared.cpu.lock().unwrap();
                    cpu.request_interrupt(vector);
                    // HLT resumption must not depend on the scheduler's
                    // run state, so a CPU stopped in HLT takes the
                    // interrupt here rather than waiting for a tick.
                    if cpu.halted() && cpu.interrupt_deliverable() {
                        cpu.pending_cycles = 0;
                        cpu.step();
                    }
                    publish(&shared, &cpu);
                }
                Command::SetClockHz(hz) => {
                    if hz > 0.0 {
                        period = Duration::from_secs_f64(1.0 / hz);
                        next = Instant::now();
                    }
                }
                Command::Sync(reply) => {
                    let _ = reply.send(());
                }
                Command::Shutdown => {
                    debug!("scheduler shutting down");
                    return;
                }
            }
        }

        // Sleep to the next period boundary, then work off every boundary
        // that has passed. pending_cycles burns down one per period; the
        // fetch happens on the period where it reaches zero.
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }

        let mut cpu = shared.cpu.lock().unwrap();
        if cpu.halted() && !cpu.interrupt_deliverable() {
            publish(&shared, &cpu);
            drop(cpu);
            // Nothing to do until an interrupt or reset arrives
            thread::sleep(Duration::from_millis(1));
            next = Instant::now();
            continue;
        }
        let mut batch = 0;
        loop {
            if cpu.pending_cycles > 0 {
                cpu.pending_cycles -= 1;
            } else {
                let cost = cpu.step();
                if cost > 0 {
                    cpu.pending_cycles = cost - 1;
                }
                if cpu.halted() {
                    publish(&shared, &cpu);
                    break;
                }
            }
            next += period;
            batch += 1;
            if batch >= MAX_BATCH || next > Instant::now() {
                break;
            }
        }
    }
}

fn publish(shared: &Shared, cpu: &Cpu) {
    shared.halted.store(cpu.halted(), Ordering::Release);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::asm::assemble;
    use crate::runtime::DEFAULT_ORIGIN;

    fn emulator_with(src: &str) -> Emulator {
        let out = assemble(src, "t.asm").unwrap();
        let mut cpu = Cpu::default();
        cpu.load(out.image.as_bytes(), DEFAULT_ORIGIN);
        Emulator::spawn(cpu)
    }

    fn wait_halted(emu: &Emulator) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !emu.is_halted() {
            assert!(Instant::now() < deadline, "program did not halt in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn free_run_to_halt() {
        let emu = emulator_with("ORG 0800h\nMVI A, 07h\nMVI B, 05h\nADD B\nHLT\n");
        emu.set_clock_hz(10_000_000.0);
        emu.run();
        wait_halted(&emu);
        assert_eq!(emu.register("A"), Some(RegValue::Byte(0x0C)));
        assert!(emu.flag(Flag::P));
    }

    #[test]
    fn step_is_exact() {
        let emu = emulator_with("ORG 0800h\nMVI A, 1\nMVI B, 2\nHLT\n");
        emu.step();
        emu.sync();
        assert_eq!(emu.register("A"), Some(RegValue::Byte(1)));
        assert_eq!(emu.register("B"), Some(RegValue::Byte(0)));
        assert_eq!(emu.register("PC"), Some(RegValue::Word(DEFAULT_ORIGIN + 2)));
        emu.step();
        emu.sync();
        assert_eq!(emu.register("B"), Some(RegValue::Byte(2)));
    }

    #[test]
    fn reset_restores_origin() {
        let emu = emulator_with("ORG 0800h\nMVI A, 5\nHLT\n");
        emu.step();
        emu.step();
        emu.sync();
        assert!(emu.is_halted());
        emu.reset();
        emu.sync();
        assert!(!emu.is_halted());
        assert_eq!(emu.register("PC"), Some(RegValue::Word(DEFAULT_ORIGIN)));
        assert_eq!(emu.register("A"), Some(RegValue::Byte(0)));
    }

    #[test]
    fn write_port_feeds_in_instruction() {
        let emu = emulator_with("ORG 0800h\nIN 20h\nHLT\n");
        emu.write_port(0x20, 0x42);
        emu.set_clock_hz(10_000_000.0);
        emu.run();
        wait_halted(&emu);
        assert_eq!(emu.register("A"), Some(RegValue::Byte(0x42)));
    }

    #[test]
    fn interrupt_resumes_run() {
        // Vector 2 lands at 0x0010
        let emu = emulator_with("ORG 10h\nMVI A, 77h\nHLT\nORG 0800h\nLXI SP, 2000h\nEI\nHLT\n");
        emu.set_clock_hz(10_000_000.0);
        emu.run();
        wait_halted(&emu);
        emu.request_interrupt(2);
        emu.sync();
        wait_halted(&emu);
        assert_eq!(emu.register("A"), Some(RegValue::Byte(0x77)));
    }

    #[test]
    fn interrupt_delivery_does_not_need_run() {
        // Vector 1 lands at 0x0008; the scheduler is never set running
        let emu = emulator_with(
            "ORG 8h\nMVI A, 21h\nHLT\nORG 0800h\nLXI SP, 2000h\nEI\nHLT\n",
        );
        emu.step();
        emu.step();
        emu.step();
        emu.sync();
        assert!(emu.is_halted());

        emu.request_interrupt(1);
        emu.sync();
        // Delivery left HLT behind and ran the first handler instruction
        assert!(!emu.is_halted());
        assert_eq!(emu.register("A"), Some(RegValue::Byte(0x21)));
        assert_eq!(emu.register("PC"), Some(RegValue::Word(0x000A)));
        // The return address on the stack points past the HLT at 0x0804
        let stacked = emu.with_cpu(|cpu| cpu.memory().read16(cpu.sp()));
        assert_eq!(stacked, 0x0805);
    }

    #[test]
    fn shutdown_returns_the_cpu() {
        let emu = emulator_with("ORG 0800h\nMVI A, 3\nHLT\n");
        emu.step();
        emu.sync();
        let cpu = emu.shutdown();
        assert_eq!(cpu.a(), 3);
    }
}
