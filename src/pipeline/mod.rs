pub mod registry;
pub mod preprocess;
pub mod fallback;
pub mod extract; // Coverage gate + generator fallback
