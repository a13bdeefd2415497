//! ABI Compatibility Testing for fmctl
//!
//! Verifies that the `fmctl-ffi` structures are binary-compatible with the
//! Fabric Manager SDK's C structures.

#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]

use core::mem::{align_of, size_of};

/// Macro to verify structure size matches expected value
#[macro_export]
macro_rules! verify_size {
    ($rust_type:ty, $expected_size:expr) => {
        const _: () = {
            const SIZE: usize = ::core::mem::size_of::<$rust_type>();
            const EXPECTED: usize = $expected_size;

            assert!(SIZE == EXPECTED, "Size mismatch");
        };
    };
}

/// Macro to verify field offset matches expected value
#[macro_export]
macro_rules! verify_offset {
    ($type:ty, $field:ident, $expected_offset:expr) => {
        const _: () = {
            use memoffset::offset_of;
            const OFFSET: usize = offset_of!($type, $field);
            const EXPECTED: usize = $expected_offset;

            assert!(OFFSET == EXPECTED, "Offset mismatch");
        };
    };
}

/// Macro to verify type alignment
#[macro_export]
macro_rules! verify_align {
    ($type:ty, $expected_align:expr) => {
        const _: () = {
            const ALIGN: usize = ::core::mem::align_of::<$type>();
            const EXPECTED: usize = $expected_align;

            assert!(ALIGN == EXPECTED, "Alignment mismatch");
        };
    };
}

/// Layout values computed by the C compiler from the reference header.
///
/// Declared here rather than in the test files so the `fm_reference`
/// archive produced by the build script is linked into every test binary
/// that uses this crate.
pub mod c_reference {
    extern "C" {
        pub fn connect_params_size() -> usize;
        pub fn connect_params_align() -> usize;
        pub fn connect_params_address_offset() -> usize;
        pub fn connect_params_timeout_offset() -> usize;
        pub fn connect_params_socket_offset() -> usize;

        pub fn gpu_info_size() -> usize;
        pub fn gpu_info_align() -> usize;
        pub fn gpu_info_uuid_offset() -> usize;
        pub fn gpu_info_pci_bus_id_offset() -> usize;
        pub fn gpu_info_nvlinks_available_offset() -> usize;
        pub fn gpu_info_max_nvlinks_offset() -> usize;
        pub fn gpu_info_line_rate_offset() -> usize;

        pub fn partition_info_size() -> usize;
        pub fn partition_info_align() -> usize;
        pub fn partition_info_is_active_offset() -> usize;
        pub fn partition_info_num_gpus_offset() -> usize;
        pub fn partition_info_gpu_info_offset() -> usize;

        pub fn partition_list_size() -> usize;
        pub fn partition_list_align() -> usize;
        pub fn partition_list_num_offset() -> usize;
        pub fn partition_list_max_offset() -> usize;
        pub fn partition_list_info_offset() -> usize;

        pub fn return_code_size() -> usize;

        pub static VERIFY_CONNECT_PARAMS_VERSION: u32;
        pub static VERIFY_PARTITION_LIST_VERSION: u32;
        pub static VERIFY_RETURN_CODES: [i32; 11];
    }
}

/// Outcome of comparing one Rust structure against its C layout.
#[derive(Debug, PartialEq, Eq)]
pub struct AbiCompatResult {
    pub struct_name: &'static str,
    pub size_match: bool,
    pub align_match: bool,
}

impl AbiCompatResult {
    pub fn is_compatible(&self) -> bool {
        self.size_match && self.align_match
    }
}

/// Compare a Rust structure's size and alignment with the C values.
pub fn verify_struct_layout<T>(
    name: &'static str,
    expected_size: usize,
    expected_align: usize,
) -> AbiCompatResult {
    AbiCompatResult {
        struct_name: name,
        size_match: size_of::<T>() == expected_size,
        align_match: align_of::<T>() == expected_align,
    }
}
