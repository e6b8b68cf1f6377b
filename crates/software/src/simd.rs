//! Runs tile work with the widest vector extension the cpu has, so the rasterizer loops autovectorize.

#[cfg(target_arch = "x86_64")]
pub fn dispatch<F: FnOnce()>(f: F) {
    if is_x86_feature_detected!("avx2") {
        // SAFETY: avx2 is available
        unsafe { with_avx2(f) }
    } else if is_x86_feature_detected!("sse4.2") {
        // SAFETY: sse4.2 is available
        unsafe { with_sse42(f) }
    } else {
        f()
    }

    #[target_feature(enable = "avx2,fma")]
    unsafe fn with_avx2<F: FnOnce()>(f: F) {
        f()
    }

    #[target_feature(enable = "sse4.2")]
    unsafe fn with_sse42<F: FnOnce()>(f: F) {
        f()
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub fn dispatch<F: FnOnce()>(f: F) {
    f()
}
