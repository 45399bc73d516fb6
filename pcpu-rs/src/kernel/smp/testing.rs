//! Host-side stand-ins for the hardware and the collaborators: every
//! simulated core is a std thread.
//!
//! The crate's `print!`/`println!` shadow std's in tests and go to the
//! registered output driver, so use `std::println!` for test diagnostics or
//! read them back through [`output_capture`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use pcpu_defs::{CpuId, BSP_CPU_ID, IA32_TSC_AUX, INVALID_CPU_ID};
use spin::Once;

use crate::kernel::cpu::Cpu;
use crate::kernel::ipi::{IpiController, IpiKind};
use crate::kernel::output::ConsoleWriter;
use crate::kernel::smp::{Platform, SchedHook, Smp, SmpConfig, Trampoline};
use crate::kernel::timer::Clock;
use crate::kernel::utils::CpuMask;

pub const TRAMPOLINE_ADDR: u64 = 0x9_2000;

pub struct SimCpu {
    lapic: u32,
    monitor: bool,
    msrs: Mutex<HashMap<u32, u64>>,
    mwaits: AtomicUsize,
    set_id_delay_us: AtomicU64,
    vmx_on: AtomicBool,
    flushed: AtomicBool,
    halted: AtomicBool,
}

impl SimCpu {
    pub fn new(id: CpuId, lapic: u32, monitor: bool) -> SimCpu {
        let mut msrs = HashMap::new();
        msrs.insert(IA32_TSC_AUX, id as u64);

        SimCpu {
            lapic,
            monitor,
            msrs: Mutex::new(msrs),
            mwaits: AtomicUsize::new(0),
            set_id_delay_us: AtomicU64::new(0),
            vmx_on: AtomicBool::new(true),
            flushed: AtomicBool::new(false),
            halted: AtomicBool::new(false),
        }
    }

    pub fn leak(id: CpuId, lapic: u32, monitor: bool) -> &'static SimCpu {
        Box::leak(Box::new(SimCpu::new(id, lapic, monitor)))
    }

    /// Make every later `set_id` take `delay`.
    pub fn slow_set_id(&self, delay: Duration) {
        self.set_id_delay_us
            .store(delay.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn mwait_count(&self) -> usize {
        self.mwaits.load(Ordering::SeqCst)
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn vmx_is_on(&self) -> bool {
        self.vmx_on.load(Ordering::SeqCst)
    }

    pub fn caches_flushed(&self) -> bool {
        self.flushed.load(Ordering::SeqCst)
    }
}

impl Cpu for SimCpu {
    fn id(&self) -> CpuId {
        self.read_msr(IA32_TSC_AUX) as CpuId
    }

    fn set_id(&self, id: CpuId) {
        let delay = self.set_id_delay_us.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_micros(delay));
        }

        self.write_msr(IA32_TSC_AUX, id as u64);
    }

    fn lapic_id(&self) -> u32 {
        self.lapic
    }

    fn has_monitor(&self) -> bool {
        self.monitor
    }

    fn monitor(&self, _addr: &AtomicU64) {}

    fn mwait(&self) {
        // every wake is spurious, the caller has to re-check
        self.mwaits.fetch_add(1, Ordering::SeqCst);
        std::thread::yield_now();
    }

    fn relax(&self) {
        std::thread::yield_now();
    }

    fn read_msr(&self, index: u32) -> u64 {
        self.msrs.lock().unwrap().get(&index).copied().unwrap_or(0)
    }

    fn write_msr(&self, index: u32, value: u64) {
        self.msrs.lock().unwrap().insert(index, value);
    }

    fn vmx_off(&self) {
        self.vmx_on.store(false, Ordering::SeqCst);
    }

    fn flush_caches(&self) {
        self.flushed.store(true, Ordering::SeqCst);
    }

    fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
        std::thread::park();
    }
}

pub struct StdClock {
    base: Instant,
}

impl StdClock {
    pub fn new() -> StdClock {
        StdClock {
            base: Instant::now(),
        }
    }
}

impl Clock for StdClock {
    fn cycles(&self) -> u64 {
        self.base.elapsed().as_nanos() as u64
    }

    fn us_to_cycles(&self, us: u64) -> u64 {
        us * 1000
    }

    fn udelay(&self, us: u64) {
        let dest = self.cycles() + self.us_to_cycles(us);

        while self.cycles() < dest {
            std::thread::yield_now();
        }
    }
}

/// Time only moves when `udelay` or `advance_us` is called.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new() -> ManualClock {
        ManualClock {
            now: AtomicU64::new(0),
        }
    }

    pub fn advance_us(&self, us: u64) {
        self.now.fetch_add(self.us_to_cycles(us), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn cycles(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn us_to_cycles(&self, us: u64) -> u64 {
        us * 1000
    }

    fn udelay(&self, us: u64) {
        self.advance_us(us);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Behaviour {
    Responsive,
    Unresponsive,
    /// Comes up only after the given delay.
    Late(Duration),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SimEvent {
    /// Startup signal sent to the core.
    Startup(CpuId),
    /// `boot_secondary` returned on the core.
    Online { cpu: CpuId, gate_held: bool },
}

pub struct SimMachine {
    cores: Vec<&'static SimCpu>,
    behaviour: Vec<Behaviour>,
    smp: Once<&'static Smp>,
    this: Once<&'static SimMachine>,
    clock: StdClock,
    startups: Mutex<Vec<(CpuId, u64)>>,
    signal_delays: Mutex<HashMap<CpuId, Duration>>,
    events: Mutex<Vec<SimEvent>>,
    ipis: Mutex<Vec<(CpuId, IpiKind)>>,
    stacks: Mutex<Vec<CpuId>>,
    deinits: Mutex<Vec<CpuId>>,
    calls: AtomicUsize,
    prepares: AtomicUsize,
}

pub fn lapic_for(id: CpuId) -> u32 {
    0x10 + 2 * id as u32
}

impl SimMachine {
    /// Machine with the BSP registered and topology known, APs not started.
    pub fn new(behaviour: &[Behaviour]) -> (&'static SimMachine, &'static Smp) {
        SimMachine::with_config(behaviour, SmpConfig::default())
    }

    pub fn with_config(
        behaviour: &[Behaviour],
        config: SmpConfig,
    ) -> (&'static SimMachine, &'static Smp) {
        let (m, smp) = SimMachine::unbooted(behaviour, config);

        smp.init_topology(&m.lapic_ids()).unwrap();
        smp.init_pcpu_state(m.cpu(BSP_CPU_ID), BSP_CPU_ID).unwrap();

        (m, smp)
    }

    /// Machine with nothing registered yet.
    pub fn unbooted(
        behaviour: &[Behaviour],
        config: SmpConfig,
    ) -> (&'static SimMachine, &'static Smp) {
        let cores = (0..behaviour.len() as CpuId)
            .map(|id| {
                // APs learn their id during bring-up
                let preset = if id == BSP_CPU_ID { id } else { INVALID_CPU_ID };
                SimCpu::leak(preset, lapic_for(id), id % 2 == 0)
            })
            .collect();

        let m: &'static SimMachine = Box::leak(Box::new(SimMachine {
            cores,
            behaviour: behaviour.to_vec(),
            smp: Once::new(),
            this: Once::new(),
            clock: StdClock::new(),
            startups: Mutex::new(Vec::new()),
            signal_delays: Mutex::new(HashMap::new()),
            events: Mutex::new(Vec::new()),
            ipis: Mutex::new(Vec::new()),
            stacks: Mutex::new(Vec::new()),
            deinits: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            prepares: AtomicUsize::new(0),
        }));

        let platform = Platform {
            ipi: m,
            trampoline: m,
            sched: m,
            clock: &m.clock,
        };

        let smp: &'static Smp = Box::leak(Box::new(Smp::new(platform, config)));
        m.smp.call_once(|| smp);
        m.this.call_once(|| m);

        (m, smp)
    }

    pub fn clock(&self) -> &StdClock {
        &self.clock
    }

    pub fn lapic_ids(&self) -> Vec<u32> {
        (0..self.cores.len() as CpuId).map(lapic_for).collect()
    }

    pub fn cpu(&self, id: CpuId) -> &'static SimCpu {
        self.cores[id as usize]
    }

    pub fn startups(&self) -> Vec<(CpuId, u64)> {
        self.startups.lock().unwrap().clone()
    }

    pub fn started_ids(&self) -> Vec<CpuId> {
        self.startups().iter().map(|(id, _)| *id).collect()
    }

    /// Make the leader take `delay` before the startup signal to `cpu`.
    pub fn delay_signal(&self, cpu: CpuId, delay: Duration) {
        self.signal_delays.lock().unwrap().insert(cpu, delay);
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn ipis(&self) -> Vec<(CpuId, IpiKind)> {
        self.ipis.lock().unwrap().clone()
    }

    pub fn stacks(&self) -> Vec<CpuId> {
        self.stacks.lock().unwrap().clone()
    }

    pub fn deinits(&self) -> Vec<CpuId> {
        self.deinits.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prepare_count(&self) -> usize {
        self.prepares.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for `cond`.
    pub fn eventually<F: Fn() -> bool>(&self, timeout: Duration, cond: F) -> bool {
        let start = Instant::now();

        while start.elapsed() < timeout {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        cond()
    }

    fn smp(&self) -> &'static Smp {
        *self.smp.get().unwrap()
    }

    fn spawn_ap(&'static self, id: CpuId, delay: Option<Duration>) {
        let cpu = self.cpu(id);
        let smp = self.smp();

        std::thread::spawn(move || {
            if let Some(d) = delay {
                std::thread::sleep(d);
            }

            let id = smp.boot_secondary(cpu).unwrap();

            self.events.lock().unwrap().push(SimEvent::Online {
                cpu: id,
                gate_held: smp.gate.is_held(),
            });

            loop {
                if smp.consume_offline_request(id) {
                    smp.retire_self(cpu);
                }
                std::thread::sleep(Duration::from_micros(50));
            }
        });
    }
}

impl IpiController for SimMachine {
    fn send_startup(&self, cpu: CpuId, entry: u64) {
        let delay = self.signal_delays.lock().unwrap().get(&cpu).copied();
        if let Some(d) = delay {
            std::thread::sleep(d);
        }

        self.startups.lock().unwrap().push((cpu, entry));
        self.events.lock().unwrap().push(SimEvent::Startup(cpu));

        let this: &'static SimMachine = *self.this.get().unwrap();

        match self.behaviour.get(cpu as usize) {
            Some(Behaviour::Responsive) => this.spawn_ap(cpu, None),
            Some(Behaviour::Late(d)) => this.spawn_ap(cpu, Some(*d)),
            Some(Behaviour::Unresponsive) | None => {}
        }
    }

    fn send_ipi(&self, cpu: CpuId, kind: IpiKind) {
        self.ipis.lock().unwrap().push((cpu, kind));
    }

    fn call_on(&self, mask: CpuMask, f: &(dyn Fn(&dyn Cpu) + Sync)) {
        self.calls.fetch_add(1, Ordering::SeqCst);

        for id in mask.iter() {
            f(self.cpu(id));
        }
    }
}

impl Trampoline for SimMachine {
    fn prepare(&self) -> u64 {
        self.prepares.fetch_add(1, Ordering::SeqCst);
        TRAMPOLINE_ADDR
    }

    fn write_stack(&self, cpu: CpuId) {
        self.stacks.lock().unwrap().push(cpu);
    }
}

impl SchedHook for SimMachine {
    fn deinit(&self, cpu: CpuId) {
        self.deinits.lock().unwrap().push(cpu);
    }
}

pub struct LogCapture {
    text: Mutex<String>,
}

impl LogCapture {
    pub fn contains(&self, s: &str) -> bool {
        self.text.lock().unwrap().contains(s)
    }
}

impl ConsoleWriter for LogCapture {
    fn write_str(&self, s: &str) -> core::fmt::Result {
        self.text.lock().unwrap().push_str(s);
        Ok(())
    }
}

static CAPTURE: Once<&'static LogCapture> = Once::new();
static OUTPUT_CAPTURE: Once<&'static LogCapture> = Once::new();

/// Route the log sink into memory for the whole test binary.
pub fn log_capture() -> &'static LogCapture {
    CAPTURE.call_once(|| {
        let c: &'static LogCapture = Box::leak(Box::new(LogCapture {
            text: Mutex::new(String::new()),
        }));
        crate::kernel::output::register_log_driver(c);
        c
    })
}

/// Route `print!`/`println!` into memory for the whole test binary.
pub fn output_capture() -> &'static LogCapture {
    OUTPUT_CAPTURE.call_once(|| {
        let c: &'static LogCapture = Box::leak(Box::new(LogCapture {
            text: Mutex::new(String::new()),
        }));
        crate::kernel::output::register_output_driver(c);
        c
    })
}
