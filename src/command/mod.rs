mod display;
mod examples;
mod ingest;
mod interactive;
mod size;
mod stars;

pub use examples::run_examples;
pub use ingest::run_ingest;
pub use interactive::run_interactive;
pub use size::run_size;
pub use stars::run_stars;
