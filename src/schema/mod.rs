pub mod space;
pub mod symbol;
