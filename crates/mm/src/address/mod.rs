//! 页号模块
//!
//! - [`Ppn`]: 物理页号，即帧在物理内存中的下标
//! - [`Vpn`]: 区域内的虚拟页号，即页表下标
//!
//! 两者都是 `usize` 的透明包装，用类型区分“帧”和“页”，避免把一个当另一个用。

use core::fmt;

/// `impl_page_num!` 宏
/// ---------------------
/// 为页号类型生成构造、转换、步进与格式化实现。
macro_rules! impl_page_num {
    ($name:ident) => {
        impl $name {
            /// 从原始下标构造
            pub const fn new(n: usize) -> Self {
                Self(n)
            }

            /// 取原始下标
            pub const fn as_usize(self) -> usize {
                self.0
            }

            /// 向后偏移 `n` 页
            pub const fn add(self, n: usize) -> Self {
                Self(self.0 + n)
            }
        }

        impl From<usize> for $name {
            fn from(n: usize) -> Self {
                Self(n)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#x}", self.0)
            }
        }
    };
}

/// 物理页号（帧号）
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Ppn(pub usize);

/// 区域内的虚拟页号
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Vpn(pub usize);

impl_page_num!(Ppn);
impl_page_num!(Vpn);

/// 页号区间 `[start, end)` 的迭代器
pub fn vpn_range(start: Vpn, end: Vpn) -> impl DoubleEndedIterator<Item = Vpn> {
    (start.0..end.0).map(Vpn)
}
