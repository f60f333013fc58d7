pub mod auth;
pub mod carts;
pub mod orders;
pub mod products;
