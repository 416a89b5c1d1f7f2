pub mod layout;
pub mod preview;
pub mod surface;
