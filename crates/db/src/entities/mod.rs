//! `SeaORM` entity definitions.
//!
//! Enumerations (`kind`, `payment_method`) are stored as lowercase text and
//! parsed back into the ledger enums when rows are mapped.

pub mod accounts;
pub mod categories;
pub mod transactions;
pub mod users;

pub mod prelude {
    //! Entity re-exports.
    pub use super::accounts::Entity as Accounts;
    pub use super::categories::Entity as Categories;
    pub use super::transactions::Entity as Transactions;
    pub use super::users::Entity as Users;
}
