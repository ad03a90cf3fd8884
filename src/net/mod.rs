pub mod framing;
pub mod protocol;
pub mod broadcast;
pub mod transport;
pub mod session;
