pub mod adoption;
pub mod collection;
pub mod ownership;
pub mod session;
