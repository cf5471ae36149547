pub mod billing;
pub mod reference_data;
pub mod webhook;
