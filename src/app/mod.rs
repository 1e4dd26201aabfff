mod runner;

pub use runner::SessionRunner;
