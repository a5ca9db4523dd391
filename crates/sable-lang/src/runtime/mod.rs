pub mod value;
pub mod scope;
pub mod context;
pub mod interpreter;
