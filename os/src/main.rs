//! DuOS 模拟器
//!
//! 在宿主机上驱动内核：注册模拟硬件与 ELF 装载器，启动内核，
//! 然后循环投递设备事件与时钟中断，直到 init 退出或达到滴答上限。

mod sim;

use std::process::ExitCode;
use std::sync::atomic::Ordering;

use clap::Parser;
use duos::arch::{KernelImage, UserContext};
use duos::config::{DEFAULT_PMEM_SIZE, KernelConfig};
use duos::{entry, logging};
use uapi::trap::{TRAP_CLOCK, TRAP_TTY_RECEIVE, TRAP_TTY_TRANSMIT};

use sim::{DeviceEvent, ElfLoader, SimMachine, StderrOutput};

/// 模拟的内核映像：代码段第 1 页，数据段第 2 页，映像结束于第 4 页
const SIM_KERNEL_IMAGE: KernelImage = KernelImage {
    first_text_page: 1,
    first_data_page: 2,
    orig_brk_page: 4,
};

static STDERR_OUTPUT: StderrOutput = StderrOutput;

/// DuOS kernel simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Physical memory size in bytes (decimal or 0x-prefixed hex)
    #[arg(short = 'm', long, value_parser = parse_size, default_value_t = DEFAULT_PMEM_SIZE)]
    pmem: usize,

    /// Trace level, 0 (off) to 5 (trace)
    #[arg(short = 'l', long = "log-level", default_value_t = logging::DEFAULT_TRACE_LEVEL)]
    log_level: u8,

    /// Stop after this many clock ticks
    #[arg(short, long, default_value_t = 1000)]
    ticks: u64,

    /// Lines delivered to terminal 0
    #[arg(short, long)]
    input: Vec<String>,

    /// Init program and its arguments
    program: Vec<String>,
}

fn parse_size(s: &str) -> Result<usize, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid size {:?}: {}", s, e))
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = KernelConfig {
        pmem_size: args.pmem,
        trace_level: args.log_level,
        ..KernelConfig::default()
    };
    logging::init(&STDERR_OUTPUT, config.trace_level);

    let machine = SimMachine::new(config.num_terminals, &args.input);
    let events = machine.events();
    let halted = machine.halted();
    let layout = config.layout;
    entry::prepare(config, SIM_KERNEL_IMAGE, Box::new(machine), Box::new(ElfLoader));

    // 内核堆分配器在开启虚拟内存之前已经用掉半页
    let early_brk = layout.page_addr(SIM_KERNEL_IMAGE.orig_brk_page) + layout.page_size() / 2;
    if entry::set_kernel_brk(early_brk) != uapi::errno::SUCCESS {
        eprintln!("duos: early kernel brk rejected");
        return ExitCode::FAILURE;
    }

    let mut ctx = UserContext::default();
    entry::kernel_start(&args.program, args.pmem, &mut ctx);

    for _ in 0..args.ticks {
        if halted.load(Ordering::Acquire) {
            break;
        }
        loop {
            let next = events.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
            let Some(event) = next else {
                break;
            };
            let (vector, tty) = match event {
                DeviceEvent::Received(tty) => (TRAP_TTY_RECEIVE, tty),
                DeviceEvent::Transmitted(tty) => (TRAP_TTY_TRANSMIT, tty),
            };
            ctx.vector = vector;
            ctx.code = tty;
            entry::trap_entry(&mut ctx);
        }
        ctx.vector = TRAP_CLOCK;
        ctx.code = 0;
        entry::trap_entry(&mut ctx);
    }

    let ticks = entry::with_kernel(|kernel| kernel.ticks());
    eprintln!("duos: stopped after {} ticks", ticks);
    ExitCode::SUCCESS
}
