//! Page objects: one type per logical page, owning its locators and the
//! primitive interactions tests are allowed to perform on it.

pub mod login;

pub use login::LoginPage;
