#[cfg(target_os = "linux")]
pub(crate) mod linux;

#[cfg(not(target_os = "linux"))]
compile_error!("aio only supports Linux: it is a thin shim over io_setup/io_submit/io_cancel/io_getevents");
