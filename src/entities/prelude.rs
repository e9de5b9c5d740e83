pub use super::authorized_part::Entity as AuthorizedPart;
