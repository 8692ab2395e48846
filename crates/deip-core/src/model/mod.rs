pub mod account;
pub mod expertise;
pub mod funds;
pub mod proposal;
pub mod research;
pub mod witness;

pub use account::*;
pub use expertise::*;
pub use funds::*;
pub use proposal::*;
pub use research::*;
pub use witness::*;
