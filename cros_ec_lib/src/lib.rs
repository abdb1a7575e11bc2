//! A library to talk to a [Chromium EC](https://chromium.googlesource.com/chromiumos/platform/ec)
//! from the host (AP) side, over any byte oriented bus.
//!
//! The bus itself is supplied by board code through [`chromium_ec::CrosEcTransport`].

extern crate alloc;

#[macro_use]
extern crate log;

pub mod chromium_ec;
pub mod config;
mod os_specific;
mod util;
