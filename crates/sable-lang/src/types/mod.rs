pub mod val_type;
pub mod conversion;
pub mod binop_registry;
