//! 程序装载器的 Mock 实现

use std::collections::BTreeMap;

/// Mock 程序映像
#[derive(Debug, Clone, Default)]
pub struct MockImage {
    pub text: Vec<u8>,
    pub data: Vec<u8>,
    pub bss_len: usize,
    /// 入口相对代码段起点的偏移
    pub entry_offset: usize,
}

impl MockImage {
    /// 只有一页代码的最小程序
    pub fn tiny() -> Self {
        Self {
            text: vec![0x90; 16],
            data: b"hello".to_vec(),
            bss_len: 64,
            entry_offset: 0,
        }
    }
}

/// Mock 程序装载器，按名字查找预先登记的映像
#[derive(Debug, Default)]
pub struct MockLoader {
    images: BTreeMap<String, MockImage>,
    /// 每次装载请求 `(名字, 参数)`
    pub requests: Vec<(String, Vec<String>)>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个映像
    pub fn with(mut self, name: &str, image: MockImage) -> Self {
        self.images.insert(name.to_string(), image);
        self
    }

    /// 查找映像并记录请求
    pub fn find(&mut self, name: &str, args: &[String]) -> Option<MockImage> {
        self.requests.push((name.to_string(), args.to_vec()));
        self.images.get(name).cloned()
    }
}
