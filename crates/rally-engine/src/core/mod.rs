//! Physics primitives of the playfield.

pub use self::{ball::*, config::*, controller::*, paddle::*, side::*};

mod ball;
mod config;
mod controller;
mod paddle;
mod side;
