use mm::{FramePool, PagingError, Ppn};

#[test]
fn test_allocate_lowest_first() {
    let mut pool = FramePool::new(8);
    assert_eq!(pool.allocate(), Ok(Ppn::new(0)));
    assert_eq!(pool.allocate(), Ok(Ppn::new(1)));
    assert_eq!(pool.allocate(), Ok(Ppn::new(2)));

    pool.release(Ppn::new(1));
    assert!(!pool.is_used(Ppn::new(1)));
    assert_eq!(pool.allocate(), Ok(Ppn::new(1)));
}

#[test]
fn test_exhaustion_reports_out_of_memory() {
    let mut pool = FramePool::new(3);
    for _ in 0..3 {
        pool.allocate().unwrap();
    }
    assert_eq!(pool.allocate(), Err(PagingError::OutOfMemory));
    assert_eq!(pool.free_frames(), 0);
}

#[test]
fn test_reserve_skips_frames() {
    let mut pool = FramePool::new(70);
    for i in 0..65 {
        assert!(pool.reserve(Ppn::new(i)));
    }
    // 重复保留不计数
    assert!(!pool.reserve(Ppn::new(3)));
    assert_eq!(pool.used_frames(), 65);
    assert_eq!(pool.allocate(), Ok(Ppn::new(65)));
}

#[test]
fn test_partial_last_word() {
    let mut pool = FramePool::new(66);
    for i in 0..66 {
        assert_eq!(pool.allocate(), Ok(Ppn::new(i)));
    }
    assert_eq!(pool.allocate(), Err(PagingError::OutOfMemory));
}

#[test]
#[should_panic]
fn test_release_out_of_range_panics() {
    let mut pool = FramePool::new(4);
    pool.release(Ppn::new(4));
}

#[test]
#[should_panic]
fn test_double_free_panics() {
    let mut pool = FramePool::new(4);
    let ppn = pool.allocate().unwrap();
    pool.release(ppn);
    pool.release(ppn);
}
