//! FRAM dumps from devices behind a serial USB-CAN adapter.
//!
//! # Crate Structure
//!
//! - [`transport`]: raw serial byte channel and traffic tracing
//! - [`frame`]: adapter frame codec, stream parser and receiver
//! - [`dump`]: adapter setup, device commands and dump jobs

/// Re-export transport types.
pub mod transport {
    pub use canfram_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use canfram_frame::*;
}

/// Re-export dump types.
pub mod dump {
    pub use canfram_dump::*;
}
