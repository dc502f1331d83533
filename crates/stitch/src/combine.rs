use std::path::PathBuf;

pub trait Combine {
    /// Combine two values, preferring the values in `self`.
    ///
    /// The logic follows that of Cargo's `config.toml`:
    ///
    /// > If a key is specified in multiple config files, the values will get merged together.
    /// > Numbers, strings, and booleans will use the value in the deeper config directory taking
    /// > precedence over ancestor directories, where the home directory is the lowest priority.
    #[must_use]
    fn combine(self, other: Self) -> Self;
}

macro_rules! impl_combine_or {
    ($name:ty) => {
        impl Combine for Option<$name> {
            fn combine(self, other: Option<$name>) -> Option<$name> {
                self.or(other)
            }
        }
    };
}

impl_combine_or!(String);
impl_combine_or!(PathBuf);
