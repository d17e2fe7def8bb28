//! 启动流程
//!
//! [`Bootstrap`] 保存虚拟内存开启之前的状态。硬件在调用 `kernel_start` 之前
//! 就可能推进内核 break（内核堆分配），这时只记录新值。
//! [`Bootstrap::start`] 严格按顺序完成：
//!
//! 1. 按物理内存大小建立帧池
//! 2. 保留内核映像与内核栈占用的帧
//! 3. 建立区域 0 的恒等映射
//! 4. 建立 idle 的区域 1（只有栈顶两页）
//! 5. 写页表基址/长度寄存器
//! 6. 为开启前推进的内核 break 补建映射
//! 7. 填充陷阱向量表
//! 8. 写向量表基址寄存器
//! 9. 开启虚拟内存
//! 10. 创建 idle 进程
//! 11. 装载 init

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use mm::{KernelSpace, PhysMemory, Ppn, Protection, UserSpace};

use super::sched::Scheduler;
use super::task::{IDLE_PID, INIT_PID, Pcb, PidAllocator, ProcessState, build_process_image};
use super::trap::TrapVector;
use super::Kernel;
use crate::arch::{Hardware, KernelImage, ProgramLoader, Register, UserContext};
use crate::config::KernelConfig;
use crate::device::tty::Terminal;
use crate::error::{KernelError, KernelResult};
use crate::ipc::HandleTable;
use crate::logging;

/// idle 进程的初始栈页数
const IDLE_STACK_PAGES: usize = 2;

/// 虚拟内存开启之前的内核
pub struct Bootstrap {
    config: KernelConfig,
    image: KernelImage,
    hw: Box<dyn Hardware>,
    loader: Box<dyn ProgramLoader>,
    kspace: KernelSpace,
}

impl Bootstrap {
    /// 记录配置、内核映像边界与外部协作者
    pub fn new(
        config: KernelConfig,
        image: KernelImage,
        hw: Box<dyn Hardware>,
        loader: Box<dyn ProgramLoader>,
    ) -> Self {
        assert!(
            image.first_text_page <= image.first_data_page
                && image.first_data_page <= image.orig_brk_page,
            "boot: malformed kernel image {:?}",
            image
        );
        let kspace = KernelSpace::new(config.layout, image.orig_brk_page);
        Bootstrap {
            config,
            image,
            hw,
            loader,
            kspace,
        }
    }

    /// 开启虚拟内存之前推进内核 break，只记录
    pub fn set_kernel_brk(&mut self, addr: usize) -> KernelResult<()> {
        self.kspace.record_brk(addr).map_err(KernelError::from)
    }

    /// 当前内核 break
    pub fn kernel_brk(&self) -> usize {
        self.kspace.brk()
    }

    /// 完成启动，返回时 `ctx` 是第一个要运行的进程的上下文
    pub fn start(self, cmd_args: &[String], pmem_size: usize, ctx: &mut UserContext) -> Kernel {
        let Bootstrap {
            config,
            image,
            mut hw,
            loader,
            mut kspace,
        } = self;
        let layout = config.layout;

        // 1
        let mut mem = PhysMemory::new(&layout, pmem_size);
        let total = mem.pool().total_frames();
        log::info!("boot: {} frames of {} bytes", total, layout.page_size());
        if total < layout.region_pages() || image.orig_brk_page > layout.kernel_stack_pages().start {
            panic!(
                "boot: {} frames cannot hold a kernel image ending at page {}",
                total, image.orig_brk_page
            );
        }

        // 2
        for page in (image.first_text_page..image.orig_brk_page).chain(layout.kernel_stack_pages()) {
            mem.pool_mut().reserve(Ppn::new(page));
        }
        log::debug!("boot: reserved {} kernel frames", mem.pool().used_frames());

        // 3
        kspace.identity_map(image.first_text_page..image.first_data_page, Protection::RX);
        kspace.identity_map(image.first_data_page..image.orig_brk_page, Protection::RW);
        kspace.identity_map(layout.kernel_stack_pages(), Protection::RW);

        // 4
        let idle_space = match UserSpace::with_stack(layout, IDLE_STACK_PAGES, &mut mem) {
            Ok(space) => space,
            Err(e) => panic!("boot: cannot build the idle address space: {}", e),
        };

        // 5
        hw.write_register(Register::Ptbr0, kspace.table().id().as_usize());
        hw.write_register(Register::Ptlr0, kspace.table().len());
        hw.write_register(Register::Ptbr1, idle_space.table().id().as_usize());
        hw.write_register(Register::Ptlr1, idle_space.table().len());

        // 6
        if let Err(e) = kspace.map_early_heap(&mut mem) {
            panic!("boot: cannot map the early kernel heap up to {:#x}: {}", kspace.brk(), e);
        }

        // 7, 8
        let vectors = TrapVector::new();
        hw.write_register(Register::VectorBase, layout.page_addr(image.first_data_page));

        // 9
        kspace.enable_vm();
        hw.write_register(Register::VmEnable, 1);
        log::info!(
            "boot: virtual memory enabled, {} frames free",
            mem.pool().free_frames()
        );

        // 10
        let idle_ctx = UserContext {
            pc: layout.page_addr(image.first_text_page),
            sp: layout.region1_limit() - core::mem::size_of::<u64>(),
            ..UserContext::default()
        };
        let installed = Some(idle_space.table().id());
        let mut idle = Pcb::new(IDLE_PID, None, String::from("idle"), idle_space, idle_ctx);
        idle.state = ProcessState::Running;
        let mut procs = BTreeMap::new();
        procs.insert(IDLE_PID, idle);

        let ttys = (0..config.num_terminals).map(|_| Terminal::new()).collect::<Vec<_>>();
        let mut kernel = Kernel {
            config,
            hw,
            loader,
            mem,
            kspace,
            vectors,
            procs,
            sched: Scheduler::new(),
            pids: PidAllocator::new(),
            objects: HandleTable::new(),
            ttys,
            ticks: 0,
            installed,
        };

        // 11
        kernel.load_init(cmd_args);
        let first = kernel.current_pid();
        kernel.switch_to(first, ctx);
        kernel
    }
}

impl Kernel {
    fn load_init(&mut self, cmd_args: &[String]) {
        let name = cmd_args
            .first()
            .cloned()
            .unwrap_or_else(|| self.config.init_program.clone());
        let args: Vec<String> = if cmd_args.is_empty() {
            alloc::vec![name.clone()]
        } else {
            cmd_args.to_vec()
        };

        let image = match self.loader.load(&name, &args) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("boot: cannot load init program {}: {}, running idle", name, e);
                return;
            }
        };
        let built = build_process_image(
            &self.config.layout,
            &image,
            &args,
            self.config.initial_stack_pages,
            &mut self.mem,
        );
        let (space, ctx) = match built {
            Ok(built) => built,
            Err(e) => {
                log::warn!("boot: cannot build init {}: {}, running idle", name, e);
                return;
            }
        };

        let mut init = Pcb::new(INIT_PID, None, name, space, ctx);
        init.state = ProcessState::Running;
        log::info!("boot: init is {} ({} args)", init.name, args.len());
        self.procs.insert(INIT_PID, init);
        self.pcb_mut(IDLE_PID).state = ProcessState::Ready;
        self.sched.set_current(INIT_PID);
        logging::set_current_pid(INIT_PID);
    }
}
