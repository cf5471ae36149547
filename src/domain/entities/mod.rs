pub mod customer;
pub mod event;
pub mod expandable;
pub mod invoice;
pub mod payment_method;
pub mod price;
pub mod reference;
pub mod resource;
pub mod subscription;
pub mod tax_rate;
