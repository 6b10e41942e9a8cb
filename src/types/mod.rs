mod feature;
pub use feature::*;

mod name;
pub use name::*;

mod observed_property;
pub use observed_property::*;
