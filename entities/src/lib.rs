pub mod preference;

pub mod prelude {
    pub use super::preference::Entity as Preference;
}
