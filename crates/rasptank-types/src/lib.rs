//! Wire protocol types shared by the Rasptank control server and its clients.

mod auth;
mod command;
mod envelope;

pub use auth::*;
pub use command::*;
pub use envelope::*;
