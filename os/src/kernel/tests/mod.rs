// 内核测试，在宿主机上用 test-support 的 MockMachine 与 MockLoader 驱动内核。
//
// Harness 扮演硬件：它保存“当前 CPU 上的用户上下文”，
// 每次陷阱都把它交给 `Kernel::handle_trap`，返回后换成下一个进程的上下文。

extern crate std;

mod brk;
mod reclaim;
mod sched;
mod trap;

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use test_support::mock::arch::MockMachine;
use test_support::mock::loader::{MockImage, MockLoader};
use uapi::trap::{TRAP_CLOCK, TRAP_KERNEL};

use super::Kernel;
use super::boot::Bootstrap;
use super::task::Pid;
use crate::arch::{KernelImage, UserContext};
use crate::config::KernelConfig;

/// 测试用内核映像：代码段 2..4 页，数据段 4..6 页
pub(super) const IMAGE: KernelImage = KernelImage {
    first_text_page: 2,
    first_data_page: 4,
    orig_brk_page: 6,
};

/// 第二个可执行程序，入口偏移 4
pub(super) fn child_image() -> MockImage {
    MockImage {
        text: vec![0xAA; 32],
        data: b"child".to_vec(),
        bss_len: 0,
        entry_offset: 4,
    }
}

pub(super) fn loader() -> MockLoader {
    MockLoader::new()
        .with("init", MockImage::tiny())
        .with("child", child_image())
}

pub(super) struct Harness {
    pub kernel: Kernel,
    pub ctx: UserContext,
}

impl Harness {
    /// 默认配置启动，运行 init
    pub fn boot() -> Self {
        Self::boot_with(KernelConfig::default(), IMAGE, loader(), &[])
    }

    pub fn boot_with(config: KernelConfig, image: KernelImage, loader: MockLoader, args: &[&str]) -> Self {
        let pmem = config.pmem_size;
        let terminals = config.num_terminals;
        let boot = Bootstrap::new(
            config,
            image,
            Box::new(MockMachine::new(terminals)),
            Box::new(loader),
        );
        Self::start(boot, pmem, args)
    }

    pub fn start(boot: Bootstrap, pmem: usize, args: &[&str]) -> Self {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let mut ctx = UserContext::default();
        let kernel = boot.start(&args, pmem, &mut ctx);
        Harness { kernel, ctx }
    }

    pub fn current(&self) -> Pid {
        self.kernel.current_pid()
    }

    /// 投递一次陷阱
    pub fn trap(&mut self, vector: usize, code: usize) {
        self.ctx.vector = vector;
        self.ctx.code = code;
        self.kernel.handle_trap(&mut self.ctx);
    }

    /// 当前进程发起系统调用，返回调用者
    pub fn syscall(&mut self, code: usize, args: &[usize]) -> Pid {
        let caller = self.current();
        for (i, arg) in args.iter().enumerate() {
            self.ctx.regs[i] = *arg;
        }
        self.trap(TRAP_KERNEL, code);
        caller
    }

    /// 发起一次不会阻塞的系统调用并取回返回值
    pub fn call(&mut self, code: usize, args: &[usize]) -> i64 {
        let caller = self.syscall(code, args);
        self.ret(caller)
    }

    /// 进程保存的 `regs[0]`
    pub fn ret(&self, pid: Pid) -> i64 {
        self.kernel.process(pid).unwrap().ctx.return_value()
    }

    pub fn tick(&mut self) {
        self.trap(TRAP_CLOCK, 0);
    }

    /// 推进时钟直到 `pid` 上 CPU
    pub fn run(&mut self, pid: Pid) {
        for _ in 0..64 {
            if self.current() == pid {
                return;
            }
            self.tick();
        }
        panic!("pid {} never scheduled", pid);
    }

    /// 进程栈底附近一块可读写的内存
    pub fn scratch(&self, pid: Pid) -> usize {
        self.kernel.process(pid).unwrap().space.stack_low() + 0x100
    }

    pub fn write_mem(&mut self, pid: Pid, addr: usize, data: &[u8]) {
        self.kernel.copy_to_user(pid, addr, data).unwrap();
    }

    pub fn read_mem(&self, pid: Pid, addr: usize, len: usize) -> Vec<u8> {
        self.kernel.copy_from_user(pid, addr, len).unwrap()
    }

    pub fn read_i32(&self, pid: Pid, addr: usize) -> i32 {
        let bytes = self.read_mem(pid, addr, 4);
        i32::from_le_bytes(bytes.try_into().unwrap())
    }

    pub fn read_word(&self, pid: Pid, addr: usize) -> usize {
        let bytes = self.read_mem(pid, addr, 8);
        u64::from_le_bytes(bytes.try_into().unwrap()) as usize
    }

    /// 在进程内存中放一个以 NUL 结尾的字符串
    pub fn put_cstr(&mut self, pid: Pid, addr: usize, s: &str) {
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.write_mem(pid, addr, &bytes);
    }

    /// 当前进程 fork，返回子进程号
    pub fn fork(&mut self) -> Pid {
        let child = self.call(uapi::syscall::SYS_FORK, &[]);
        assert!(child > 0, "fork failed");
        child as Pid
    }

    pub fn machine(&self) -> &MockMachine {
        self.kernel
            .hardware()
            .as_any()
            .downcast_ref::<MockMachine>()
            .unwrap()
    }

    pub fn machine_mut(&mut self) -> &mut MockMachine {
        self.kernel
            .hardware_mut()
            .as_any_mut()
            .downcast_mut::<MockMachine>()
            .unwrap()
    }

    /// 分配掉空闲帧，只留下 `keep` 个
    pub fn exhaust_frames(&mut self, keep: usize) {
        while self.kernel.mem.pool().free_frames() > keep {
            self.kernel.mem.alloc_frame().unwrap();
        }
    }

    /// 已用帧数等于所有页表中的有效项数
    pub fn assert_frames_conserved(&self) {
        assert_eq!(
            self.kernel.frames().used_frames(),
            self.kernel.mapped_frames()
        );
    }
}
