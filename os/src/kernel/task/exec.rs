//! 程序映像装入
//!
//! 新地址空间自低向高依次为：
//!
//! ```text
//! region1_base                                             region1_limit
//! | text (RX) | data + bss (RW) | heap -> ... <- stack | argc argv[] strings |
//! ```
//!
//! 参数字符串放在栈顶，其下是以 NULL 结尾的 8 字节指针数组，再下面是 argc。
//! 初始栈指针指向 argc。

use alloc::string::String;
use alloc::vec::Vec;

use mm::{MachineLayout, PagingError, PagingResult, PhysMemory, Protection, UserSpace};

use crate::arch::{ProgramImage, UserContext};
use crate::error::{KernelError, KernelResult};

const WORD: usize = core::mem::size_of::<u64>();

/// 参数区布局
struct ArgLayout {
    strings: usize,
    argv: usize,
    argc_addr: usize,
}

impl ArgLayout {
    fn new(top: usize, args: &[String]) -> Option<Self> {
        let strings_len: usize = args.iter().map(|a| a.len() + 1).sum();
        let strings = top.checked_sub(strings_len)?;
        let argv = (strings & !(WORD - 1)).checked_sub((args.len() + 1) * WORD)?;
        let argc_addr = argv.checked_sub(WORD)?;
        Some(ArgLayout {
            strings,
            argv,
            argc_addr,
        })
    }
}

/// 按程序映像构建一个完整的地址空间和初始上下文。
///
/// 失败时已分配的帧全部释放：帧耗尽返回 [`KernelError::OutOfMemory`]，
/// 映像放不进区域 1 返回 [`KernelError::InvalidProgram`]。
pub(crate) fn build_process_image(
    layout: &MachineLayout,
    image: &ProgramImage,
    args: &[String],
    stack_pages: usize,
    mem: &mut PhysMemory,
) -> KernelResult<(UserSpace, UserContext)> {
    if image.text.is_empty() || image.entry_offset >= image.text.len() {
        return Err(KernelError::InvalidProgram);
    }
    let base = layout.region1_base();
    let top = layout.region1_limit();
    let data_start = layout.up_to_page(base + image.text.len());
    let data_end = data_start + image.data.len() + image.bss_len;
    let args_at = ArgLayout::new(top, args).ok_or(KernelError::InvalidProgram)?;
    let stack_low = layout
        .down_to_page(args_at.argc_addr)
        .min(top - stack_pages * layout.page_size());

    let mut space = UserSpace::new(*layout);
    space.set_heap_start(data_end);
    if let Err(e) = populate(&mut space, image, args, &args_at, stack_low, mem) {
        space.release_all(mem);
        return Err(match e {
            PagingError::OutOfMemory => KernelError::OutOfMemory,
            _ => KernelError::InvalidProgram,
        });
    }

    let mut ctx = UserContext {
        pc: base + image.entry_offset,
        sp: args_at.argc_addr,
        ..UserContext::default()
    };
    ctx.regs[0] = args.len();
    ctx.regs[1] = args_at.argv;
    Ok((space, ctx))
}

fn populate(
    space: &mut UserSpace,
    image: &ProgramImage,
    args: &[String],
    at: &ArgLayout,
    stack_low: usize,
    mem: &mut PhysMemory,
) -> PagingResult<()> {
    let base = space.layout().region1_base();
    let text_end = base + image.text.len();
    let data_start = space.layout().up_to_page(text_end);
    let data_end = data_start + image.data.len() + image.bss_len;

    // data 先于栈映射，栈的红区检查才能看到真实的 break
    space.map_region(base, text_end, Protection::RX, mem)?;
    space.map_region(data_start, data_end, Protection::RW, mem)?;
    space.grow_stack_to(stack_low, mem)?;

    space.load_bytes(mem, base, &image.text)?;
    space.load_bytes(mem, data_start, &image.data)?;

    let mut cursor = at.strings;
    let mut pointers = Vec::with_capacity(args.len() + 1);
    for arg in args {
        pointers.push(cursor);
        space.load_bytes(mem, cursor, arg.as_bytes())?;
        space.load_bytes(mem, cursor + arg.len(), &[0])?;
        cursor += arg.len() + 1;
    }
    pointers.push(0);
    for (i, ptr) in pointers.iter().enumerate() {
        space.write_word(mem, at.argv + i * WORD, *ptr)?;
    }
    space.write_word(mem, at.argc_addr, args.len())
}
