pub mod qr;
pub mod reference;
pub mod signature;
pub mod status_mapper;
