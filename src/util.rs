pub mod history;
pub(crate) mod sync;
