pub use self::{account::*, amount::*};

mod account;
mod amount;
