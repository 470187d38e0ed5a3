pub mod ports;
pub mod transfer_use_case;
