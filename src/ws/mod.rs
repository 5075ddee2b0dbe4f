pub mod connctx;
pub mod registry;
pub mod room;
