pub mod error;
pub mod config;
pub mod atlas;
pub mod font;
pub mod manager;
pub mod text;
pub mod baked;
#[cfg(feature = "gpu")]
pub mod gpu;
#[cfg(test)]
mod bench;

#[no_mangle]
pub extern "C" fn libtext_version() -> *const std::ffi::c_char {
    c"0.1.0".as_ptr()
}
