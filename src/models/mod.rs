pub mod account;
pub mod group;
pub mod person;
pub mod user;
