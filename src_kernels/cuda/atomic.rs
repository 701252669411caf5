#![allow(unreachable_code)]

#[cfg(not(target_os = "cuda"))]
use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(not(target_os = "cuda"))]
use ember_core::utils::atomic_f32_add;

/// Atomic accumulation into global device memory.
///
/// On the device this lowers to the hardware `red`/`atom` instructions. On
/// the host (where the kernels crate is compiled for type sharing and for
/// the reference solver's accumulation primitive) the same operations are
/// backed by `core::sync::atomic`; floating addition becomes the
/// compare-and-swap retry loop over the bit representation, since no
/// native atomic float-add exists there.
pub trait AtomicAdd {
    unsafe fn global_red_add(&mut self, rhs: Self);
    unsafe fn global_atomic_add(&mut self, rhs: Self) -> Self;
}

pub trait AtomicInt {
    unsafe fn global_red_max(&mut self, rhs: Self);
    unsafe fn global_atomic_sub(&mut self, rhs: Self) -> Self;
}

impl AtomicAdd for u32 {
    unsafe fn global_red_add(&mut self, _rhs: Self) {
        #[cfg(target_os = "cuda")]
        {
            let integer_addr = self as *mut _;
            let mut global_integer_addr: *mut u32 = core::ptr::null_mut();

            asm!(
            "cvta.to.global.u64 {gbl_ptr}, {org_ptr};\
            red.global.add.u32 [{gbl_ptr}], {number};",
            gbl_ptr = out(reg64) global_integer_addr,
            org_ptr = in(reg64) integer_addr,
            number = in(reg32) _rhs
            );
        }

        #[cfg(not(target_os = "cuda"))]
        {
            (*(self as *mut Self as *const AtomicU32)).fetch_add(_rhs, Ordering::Relaxed);
        }
    }

    unsafe fn global_atomic_add(&mut self, _rhs: Self) -> Self {
        #[cfg(target_os = "cuda")]
        {
            let mut old = 0;
            let integer_addr = self as *mut _;
            let mut global_integer_addr: *mut u32 = core::ptr::null_mut();

            asm!(
            "cvta.to.global.u64 {gbl_ptr}, {org_ptr};\
            atom.global.add.u32 {old}, [{gbl_ptr}], {number};",
            gbl_ptr = out(reg64) global_integer_addr,
            org_ptr = in(reg64) integer_addr,
            number = in(reg32) _rhs,
            old = out(reg32) old,
            );

            return old;
        }

        #[cfg(not(target_os = "cuda"))]
        {
            (*(self as *mut Self as *const AtomicU32)).fetch_add(_rhs, Ordering::Relaxed)
        }
    }
}

impl AtomicInt for u32 {
    unsafe fn global_red_max(&mut self, _rhs: Self) {
        #[cfg(target_os = "cuda")]
        {
            let integer_addr = self as *mut _;
            let mut global_integer_addr: *mut u32 = core::ptr::null_mut();

            asm!(
            "cvta.to.global.u64 {gbl_ptr}, {org_ptr};\
            red.global.max.u32 [{gbl_ptr}], {number};",
            gbl_ptr = out(reg64) global_integer_addr,
            org_ptr = in(reg64) integer_addr,
            number = in(reg32) _rhs
            );
        }

        #[cfg(not(target_os = "cuda"))]
        {
            (*(self as *mut Self as *const AtomicU32)).fetch_max(_rhs, Ordering::Relaxed);
        }
    }

    unsafe fn global_atomic_sub(&mut self, _rhs: Self) -> Self {
        #[cfg(target_os = "cuda")]
        {
            // The hardware has no global subtraction; add the two's
            // complement instead.
            let mut old = 0;
            let negated = _rhs.wrapping_neg();
            let integer_addr = self as *mut _;
            let mut global_integer_addr: *mut u32 = core::ptr::null_mut();

            asm!(
            "cvta.to.global.u64 {gbl_ptr}, {org_ptr};\
            atom.global.add.u32 {old}, [{gbl_ptr}], {number};",
            gbl_ptr = out(reg64) global_integer_addr,
            org_ptr = in(reg64) integer_addr,
            number = in(reg32) negated,
            old = out(reg32) old,
            );

            return old;
        }

        #[cfg(not(target_os = "cuda"))]
        {
            (*(self as *mut Self as *const AtomicU32)).fetch_sub(_rhs, Ordering::Relaxed)
        }
    }
}

impl AtomicAdd for f32 {
    unsafe fn global_red_add(&mut self, _rhs: Self) {
        #[cfg(target_os = "cuda")]
        {
            let float_addr = self as *mut _;
            let mut global_float_addr: *mut f32 = core::ptr::null_mut();

            asm!(
            "cvta.to.global.u64 {gbl_ptr}, {org_ptr};\
            red.global.add.f32 [{gbl_ptr}], {number};",
            gbl_ptr = out(reg64) global_float_addr,
            org_ptr = in(reg64) float_addr,
            number = in(reg32) _rhs
            );
        }

        #[cfg(not(target_os = "cuda"))]
        {
            atomic_f32_add(&*(self as *mut Self as *const AtomicU32), _rhs);
        }
    }

    unsafe fn global_atomic_add(&mut self, _rhs: Self) -> Self {
        #[cfg(target_os = "cuda")]
        {
            let mut old = 0.0;
            let float_addr = self as *mut _;
            let mut global_float_addr: *mut f32 = core::ptr::null_mut();

            asm!(
            "cvta.to.global.u64 {gbl_ptr}, {org_ptr};\
            atom.global.add.f32 {old}, [{gbl_ptr}], {number};",
            gbl_ptr = out(reg64) global_float_addr,
            org_ptr = in(reg64) float_addr,
            number = in(reg32) _rhs,
            old = out(reg32) old
            );

            return old;
        }

        #[cfg(not(target_os = "cuda"))]
        {
            atomic_f32_add(&*(self as *mut Self as *const AtomicU32), _rhs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_fallbacks_are_atomic() {
        let mut count = 0u32;
        let mut sum = 0.0f32;

        unsafe {
            assert_eq!(count.global_atomic_add(3), 0);
            assert_eq!(count.global_atomic_sub(1), 3);
            count.global_red_max(7);
            count.global_red_max(5);
            assert_eq!(count, 7);

            sum.global_red_add(1.5);
            assert_eq!(sum.global_atomic_add(0.5), 1.5);
            assert_eq!(sum, 2.0);
        }
    }
}
