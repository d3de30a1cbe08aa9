pub mod apply;
pub mod delete;
pub mod observe;
pub mod ping;
