pub mod groups;
pub mod health;
pub mod people;
pub mod users;
