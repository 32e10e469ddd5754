pub mod crud;
pub mod router;
mod run;

pub use run::run;
