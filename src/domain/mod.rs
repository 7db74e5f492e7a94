pub mod branch;
pub mod entity;
pub mod repository;
pub mod session;
pub mod work_item;
